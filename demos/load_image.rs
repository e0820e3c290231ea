//! Demonstration of reactive image loading
//!
//! Run with `RUST_LOG=tincan_use=debug cargo run --example load_image` to see
//! every execution and superseded result.

use image::DynamicImage;
use std::error::Error;
use tincan_use::{
    use_image_with, FsImageLoader, ImageSource, Signal, UseImage, UseImageOptions, Viewport,
};

fn report(label: &str, image: &UseImage) {
    match (image.state(), image.error()) {
        (Some(loaded), _) => println!(
            "{label}: loaded {} ({}x{})",
            loaded.current_src(),
            loaded.width(),
            loaded.height()
        ),
        (None, Some(err)) => println!("{label}: {err}"),
        (None, None) => println!("{label}: loading = {}", image.is_loading()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let assets = tempfile::tempdir()?;
    DynamicImage::new_rgb8(64, 64).save(assets.path().join("logo.png"))?;
    DynamicImage::new_rgb8(128, 128).save(assets.path().join("logo@2x.png"))?;

    let loader = FsImageLoader::new()
        .with_base_dir(assets.path())
        .with_viewport(Viewport::default().with_device_pixel_ratio(2.0));

    let source = Signal::new(ImageSource::new("logo.png")?);
    let image = use_image_with(&source, loader, UseImageOptions::default())?;

    image.settled().await;
    report("logo.png on a 2x display", &image);

    source.update(|s| {
        if let Err(err) = s.set_srcset(Some("logo@2x.png 2x")) {
            eprintln!("rejected srcset: {err}");
        }
    });
    report("after adding srcset", &image);
    image.settled().await;
    report("after adding srcset", &image);

    source.set(ImageSource::new("missing.png")?);
    image.settled().await;
    report("missing.png", &image);

    Ok(())
}
