//! The `folio render` command: write one page as an image file.
//!
//! Useful for checking what the recognizer will see at a given scale.

use std::path::PathBuf;

use clap::Args;
use folio_core::{
    ColorMode, Config, DocumentDiscovery, DocumentSource, EncodeFormat, FillColor, Image,
};

/// Arguments for the `render` command.
#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// PDF file, image file, or folder of page images
    pub input: PathBuf,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Output image; the format follows the extension (png, jpg, tif, bmp, webp)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Render resolution multiplier [default: from config]
    #[arg(long)]
    pub scale: Option<f32>,

    /// Shrink to fit within WIDTHxHEIGHT, keeping the aspect ratio
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    pub thumbnail: Option<(u32, u32)>,

    /// Pad the thumbnail to exactly WIDTHxHEIGHT
    #[arg(long, requires = "thumbnail")]
    pub exact_fit: bool,

    /// Padding color for --exact-fit (#rgb, #rrggbb or #rrggbbaa)
    #[arg(long, default_value = "#ffffff", value_parser = parse_fill)]
    pub fill: FillColor,

    /// Convert to grayscale
    #[arg(long)]
    pub grayscale: bool,

    /// Invert the page
    #[arg(long)]
    pub invert: bool,
}

/// Execute the render command.
pub async fn execute(args: RenderArgs, config: Config) -> anyhow::Result<()> {
    let format = EncodeFormat::from_path(&args.output).ok_or_else(|| {
        anyhow::anyhow!(
            "Cannot tell the image format from {:?}\n\n  Hint: use a .png, .jpg, .tif, .bmp or .webp extension.",
            args.output
        )
    })?;

    let discovery = DocumentDiscovery::new(config.processing.clone());
    let documents = discovery.discover(&args.input);
    let document = match documents.as_slice() {
        [single] => single.clone(),
        [] => anyhow::bail!("No PDF or page images found at {:?}", args.input),
        many => anyhow::bail!(
            "{:?} holds {} documents; pass a single file to render",
            args.input,
            many.len()
        ),
    };
    let source = discovery.open(&document)?;
    let scale = args.scale.unwrap_or(config.render.scale);

    let output = args.output.clone();
    let page = args.page;
    let (width, height) = tokio::task::spawn_blocking(move || -> anyhow::Result<(u32, u32)> {
        let image = render_page(source.as_ref(), &args, scale)?;
        std::fs::write(&args.output, image.to_encoded(format)?)?;
        Ok(image.size())
    })
    .await??;

    tracing::info!(
        "Rendered page {} of {:?} at {}x{}",
        page,
        document.path,
        width,
        height
    );
    println!("{}", output.display());
    Ok(())
}

/// Render the requested page and apply the requested transforms.
pub(crate) fn render_page(
    source: &dyn DocumentSource,
    args: &RenderArgs,
    scale: f32,
) -> anyhow::Result<Image> {
    let pages = source.pages()?;
    let index = args.page as usize - 1;
    let page = pages.get(index).ok_or_else(|| {
        anyhow::anyhow!(
            "'{}' has {} page(s); page {} does not exist",
            source.title(),
            pages.len(),
            args.page
        )
    })?;

    let mut image = Image::from_pixmap(page.render(scale)?)?;
    if args.grayscale {
        image = image.convert_color_mode(ColorMode::L);
    }
    if args.invert {
        image = image.invert();
    }
    if let Some((width, height)) = args.thumbnail {
        image = image.thumbnail(width, height, args.exact_fit, args.fill)?;
    }
    Ok(image)
}

/// Parse `WIDTHxHEIGHT`, e.g. `256x256`.
fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let parse = |v: &str| -> Result<u32, String> {
        match v.trim().parse::<u32>() {
            Ok(0) | Err(_) => Err(format!("invalid dimension '{v}' in '{s}'")),
            Ok(n) => Ok(n),
        }
    };
    Ok((parse(w)?, parse(h)?))
}

fn parse_fill(s: &str) -> Result<FillColor, String> {
    FillColor::parse(s).ok_or_else(|| format!("invalid color '{s}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use folio_core::ImageSequence;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RenderArgs,
    }

    fn parse(argv: &[&str]) -> Result<RenderArgs, clap::Error> {
        let mut full = vec!["folio"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).map(|h| h.args)
    }

    /// Two RGB pages: 40x20 red and 10x10 blue.
    fn two_pages(dir: &std::path::Path) -> ImageSequence {
        let first = dir.join("1.png");
        let second = dir.join("2.png");
        image::RgbImage::from_pixel(40, 20, image::Rgb([255, 0, 0]))
            .save(&first)
            .unwrap();
        image::RgbImage::from_pixel(10, 10, image::Rgb([0, 0, 255]))
            .save(&second)
            .unwrap();
        ImageSequence::from_files("pages", vec![first, second])
    }

    #[test]
    fn parse_size_accepts_both_separators() {
        assert_eq!(parse_size("256x128").unwrap(), (256, 128));
        assert_eq!(parse_size("64X64").unwrap(), (64, 64));
        assert!(parse_size("256").is_err());
        assert!(parse_size("0x10").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn args_reject_page_zero_and_orphan_exact_fit() {
        assert!(parse(&["in.pdf", "--page", "0", "-o", "p.png"]).is_err());
        assert!(parse(&["in.pdf", "-o", "p.png", "--exact-fit"]).is_err());
        let args = parse(&["in.pdf", "-o", "p.png", "--thumbnail", "8x8", "--exact-fit"]).unwrap();
        assert_eq!(args.page, 1);
        assert_eq!(args.fill, FillColor::WHITE);
    }

    #[test]
    fn renders_requested_page_with_transforms() {
        let dir = tempfile::tempdir().unwrap();
        let source = two_pages(dir.path());
        let args = parse(&[
            "in", "-o", "p.png", "--page", "1", "--grayscale", "--thumbnail", "20x20",
            "--exact-fit",
        ])
        .unwrap();

        let image = render_page(&source, &args, 1.0).unwrap();
        assert_eq!(image.size(), (20, 20));
        assert_eq!(image.mode(), ColorMode::L);
        // Padding rows above the 20x10 content stay white.
        assert_eq!(image.data()[0], 255);
    }

    #[test]
    fn page_past_the_end_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = two_pages(dir.path());
        let args = parse(&["in", "-o", "p.png", "--page", "3"]).unwrap();

        let err = render_page(&source, &args, 1.0).unwrap_err();
        assert!(err.to_string().contains("has 2 page(s)"));
    }
}
