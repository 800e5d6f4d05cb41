// This file is an example of how to use the `beauty_vision` library.
// It beautifies a synthetic test card at 1280x720 with the default parameters and
// logs how long each stage configuration takes.

use beauty_vision::{BeautyParameters, BeautyPipeline, Frame, PipelineConfig, Pixel};
use log::info;

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn test_card() -> beauty_vision::Result<Frame> {
    Frame::from_fn(WIDTH, HEIGHT, |x, y| {
        let grain = ((x * 31 + y * 17) % 7) as f32 * 0.008;
        let (dx, dy) = (x as f32 - WIDTH as f32 / 2.0, y as f32 - HEIGHT as f32 / 2.0);
        if (dx / 260.0).powi(2) + (dy / 330.0).powi(2) < 1.0 {
            Pixel::rgb(0.74 + grain, 0.55 + grain, 0.45 + grain)
        } else {
            Pixel::rgb(0.18 + grain, 0.24, 0.33)
        }
    })
}

fn main() -> beauty_vision::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Beauty Vision Engine - Example Runner");

    let frame = test_card()?;
    let pipeline = BeautyPipeline::new(PipelineConfig::default());

    for parameters in [
        BeautyParameters::NEUTRAL,
        BeautyParameters::new(50.0, 0.0, 0.0, 0.0),
        BeautyParameters::default(),
        BeautyParameters::new(100.0, 30.0, 40.0, 0.0),
    ] {
        let (_, stats) = pipeline.process_with_stats(&frame, &parameters);
        info!(
            "{parameters:?}: {:?} (skin coverage {:.1}%)",
            stats.elapsed,
            stats.skin_coverage * 100.0
        );
    }
    Ok(())
}
