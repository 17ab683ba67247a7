//! Tesseract recognition adapter.
//!
//! Each request runs an independent `tesseract` process fed a PNG on stdin,
//! so concurrent calls share nothing but the resolved executable path.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use super::{join_languages, LanguageCode, RecognitionRequest, RecognitionResult, Recognizer};
use crate::config::RecognitionConfig;
use crate::error::RecognitionError;
use crate::raster::EncodeFormat;

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "tesseract.exe";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "tesseract";

/// Runs the Tesseract command-line engine.
pub struct TesseractRecognizer {
    config: RecognitionConfig,
    resolved: OnceLock<Option<PathBuf>>,
}

impl TesseractRecognizer {
    pub fn new(config: RecognitionConfig) -> Self {
        Self {
            config,
            resolved: OnceLock::new(),
        }
    }

    /// Resolved executable location, computed once per recognizer.
    pub fn executable(&self) -> Option<&Path> {
        self.resolved
            .get_or_init(|| {
                let found = resolve_executable(self.config.engine_path.as_deref());
                match &found {
                    Some(path) => tracing::debug!("Resolved tesseract at {:?}", path),
                    None => tracing::debug!("tesseract executable not found"),
                }
                found
            })
            .as_deref()
    }

    fn require_executable(&self) -> Result<&Path, RecognitionError> {
        self.executable().ok_or_else(|| {
            RecognitionError::EngineUnavailable(match &self.config.engine_path {
                Some(path) => format!("tesseract not found at {}", path.display()),
                None => "tesseract not found on PATH".to_string(),
            })
        })
    }

    /// Arguments for one recognition run, engine path excluded.
    fn recognition_args(&self, languages: &[LanguageCode]) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "stdin".into(),
            "stdout".into(),
            "-l".into(),
            join_languages(languages).into(),
        ];
        if let Some(dir) = self.config.tessdata_path() {
            args.push("--tessdata-dir".into());
            args.push(dir.into_os_string());
        }
        if let Some(psm) = self.config.page_segmentation_mode {
            args.push("--psm".into());
            args.push(psm.to_string().into());
        }
        args
    }

    /// Languages installed for the resolved engine (`tesseract --list-langs`).
    pub fn available_languages(&self) -> Result<Vec<LanguageCode>, RecognitionError> {
        let exe = self.require_executable()?;
        let mut command = Command::new(exe);
        command.arg("--list-langs");
        if let Some(dir) = self.config.tessdata_path() {
            command.arg("--tessdata-dir").arg(dir);
        }
        let output = command
            .stdin(Stdio::null())
            .output()
            .map_err(|e| RecognitionError::EngineUnavailable(e.to_string()))?;
        if !output.status.success() {
            return Err(RecognitionError::Failure(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(parse_language_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl Recognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn check_available(&self) -> bool {
        if self.executable().is_none() {
            return false;
        }
        match self.config.tessdata_path() {
            Some(dir) => dir.is_dir(),
            None => true,
        }
    }

    fn recognize(
        &self,
        request: RecognitionRequest,
    ) -> Result<RecognitionResult, RecognitionError> {
        let exe = self.require_executable()?;
        if request.languages.is_empty() {
            return Err(RecognitionError::Failure(
                "no recognition languages requested".to_string(),
            ));
        }

        let png = request
            .image
            .to_encoded(EncodeFormat::Png)
            .map_err(|e| RecognitionError::Failure(e.to_string()))?;

        let mut child = Command::new(exe)
            .args(self.recognition_args(&request.languages))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    RecognitionError::EngineUnavailable(e.to_string())
                }
                _ => RecognitionError::Failure(format!("failed to start tesseract: {e}")),
            })?;

        let write_result = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&png),
            None => Ok(()),
        };

        let output = child
            .wait_with_output()
            .map_err(|e| RecognitionError::Failure(format!("failed to wait for tesseract: {e}")))?;

        if !output.status.success() {
            return Err(RecognitionError::Failure(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        write_result
            .map_err(|e| RecognitionError::Failure(format!("failed to send image: {e}")))?;

        Ok(RecognitionResult {
            text: String::from_utf8_lossy(&output.stdout).into_owned(),
            token: request.token,
        })
    }
}

/// Find the engine: an explicit file, an explicit install directory, or `PATH`.
fn resolve_executable(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
        if expanded.is_file() {
            return Some(expanded);
        }
        let inside = expanded.join(EXECUTABLE_NAME);
        return inside.is_file().then_some(inside);
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(EXECUTABLE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Parse `--list-langs` output, skipping the header line.
fn parse_language_list(stdout: &str) -> Vec<LanguageCode> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of available languages"))
        .filter_map(|line| LanguageCode::new(line).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::CorrelationToken;
    use crate::raster::{ColorMode, Image};

    fn langs(list: &[&str]) -> Vec<LanguageCode> {
        list.iter().map(|c| LanguageCode::new(*c).unwrap()).collect()
    }

    fn config_with_engine(path: &Path) -> RecognitionConfig {
        RecognitionConfig {
            engine_path: Some(path.to_path_buf()),
            ..RecognitionConfig::default()
        }
    }

    fn tiny_request(token: u64) -> RecognitionRequest {
        let image = Image::from_raster(vec![255; 16], 4, 4, ColorMode::L).unwrap();
        RecognitionRequest::new(image, langs(&["ara", "eng"]), CorrelationToken::new(token))
    }

    #[test]
    fn test_missing_engine_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = TesseractRecognizer::new(config_with_engine(&dir.path().join("nope")));
        assert!(!recognizer.check_available());
        let err = recognizer.recognize(tiny_request(0)).unwrap_err();
        assert!(matches!(err, RecognitionError::EngineUnavailable(_)));
    }

    #[test]
    fn test_resolves_executable_inside_install_dir() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join(EXECUTABLE_NAME);
        std::fs::write(&exe, b"").unwrap();
        assert_eq!(resolve_executable(Some(dir.path())), Some(exe));
    }

    #[test]
    fn test_args_keep_language_order() {
        let recognizer = TesseractRecognizer::new(RecognitionConfig {
            page_segmentation_mode: Some(6),
            ..RecognitionConfig::default()
        });
        let args = recognizer.recognition_args(&langs(&["eng", "ara", "fra"]));
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["stdin", "stdout", "-l", "eng+ara+fra", "--psm", "6"]);
    }

    #[test]
    fn test_parse_language_list() {
        let stdout = "List of available languages in \"/usr/share/tessdata/\" (3):\nara\neng\nosd\n";
        assert_eq!(parse_language_list(stdout), langs(&["ara", "eng", "osd"]));
    }

    #[cfg(unix)]
    fn fake_engine(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("tesseract");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_recognize_passes_languages_and_token() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_engine(dir.path(), "cat > /dev/null\necho \"langs=$4\"");
        let recognizer = TesseractRecognizer::new(config_with_engine(&exe));
        assert!(recognizer.check_available());

        let result = recognizer.recognize(tiny_request(42)).unwrap();
        assert_eq!(result.text.trim(), "langs=ara+eng");
        assert_eq!(result.token, CorrelationToken::new(42));
    }

    #[cfg(unix)]
    #[test]
    fn test_recognize_reports_engine_failure() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_engine(dir.path(), "cat > /dev/null\necho 'Failed loading language' >&2\nexit 1");
        let recognizer = TesseractRecognizer::new(config_with_engine(&exe));

        match recognizer.recognize(tiny_request(1)).unwrap_err() {
            RecognitionError::Failure(msg) => assert!(msg.contains("Failed loading language")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
