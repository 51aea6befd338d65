use std::path::Path;

use anyhow::Context;
use captcha_denoise::{
    Config,
    cluster::cluster_pixels,
    dominant::{mean, ranked},
    recolor::recolor,
    sample::{region_width, sample_columns},
};

fn main() -> anyhow::Result<()> {
    let x = std::env::args()
        .nth(1)
        .context("Usage: ./cluster_dump <file>")?;

    let mut image = captcha_denoise::open_image(Path::new(&x))?.into_rgb8();
    let config = Config::default();

    let len = region_width(&image, config.sample_width);
    let clusters = ranked(cluster_pixels(
        sample_columns(&image, len),
        config.cluster_threshold,
        len,
    )?);

    println!("{} cluster(s) in the first {} column(s)", clusters.len(), len);
    for c in &clusters {
        println!(
            "{:>6}  rep {:?}  mean {:?}",
            c.population,
            c.representative.0,
            mean(c, config.mean).0
        );
    }

    let [background, noise, ..] = clusters.as_slice() else {
        anyhow::bail!("need at least two clusters to recolor");
    };
    recolor(
        &mut image,
        mean(background, config.mean),
        mean(noise, config.mean),
        config.limit_d,
    );

    image.save("out.png")?;

    Ok(())
}
