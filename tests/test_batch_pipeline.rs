use bandnoise::core::NoiseType;
use bandnoise::io::ImageCodec;
use bandnoise::pipeline::{
    discover_images, spawn_pipeline, NoisePipeline, PipelineConfig, PipelineEvent, PipelineState,
    ProcessingReport,
};
use bandnoise::types::{CanonicalImage, NoiseError, Sample};
use ndarray::Array3;
use std::fs;
use std::path::{Path, PathBuf};

fn write_inputs(dir: &Path, names: &[&str]) {
    let codec = ImageCodec::new();
    for (k, name) in names.iter().enumerate() {
        let image = CanonicalImage::new(Array3::from_shape_fn((5, 24, 24), |(b, i, j)| {
            (200 + (i * 24 + j) * 3 + b * 40 + k * 7) as Sample
        }));
        codec.save(&image, dir.join(name), None).unwrap();
    }
}

fn config(output_dir: PathBuf, noise_types: Vec<NoiseType>, levels: u32) -> PipelineConfig {
    PipelineConfig {
        output_dir,
        noise_types,
        levels,
        seed: Some(42),
        ..PipelineConfig::default()
    }
}

fn count_files(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[test]
fn test_two_files_two_types_three_levels() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_inputs(input.path(), &["plot_a.tif", "plot_b.tif"]);

    let mut pipeline = NoisePipeline::from_input_dir(
        input.path(),
        config(
            output.path().to_path_buf(),
            vec![NoiseType::Gaussian, NoiseType::Poisson],
            3,
        ),
    )
    .unwrap();
    assert_eq!(pipeline.total_units(), 12);

    let outcome = pipeline.run().unwrap();
    assert_eq!(outcome.state, PipelineState::Completed);
    assert_eq!(outcome.stats.total_processed, 12);
    assert_eq!(outcome.stats.total_failed, 0);
    assert_eq!(outcome.stats.original_images, 2);

    for noise_type in ["gaussian", "poisson"] {
        let type_dir = output.path().join(noise_type);
        assert_eq!(count_files(&type_dir), 6);
        for stem in ["plot_a", "plot_b"] {
            for level in 1..=3 {
                let name = format!("{}_{}_level_{:02}.tif", stem, noise_type, level);
                assert!(type_dir.join(&name).exists(), "missing {}", name);
            }
        }
    }

    let noisy = ImageCodec::new()
        .load(output.path().join("gaussian").join("plot_a_gaussian_level_02.tif"))
        .unwrap();
    assert_eq!(noisy.shape(), (5, 24, 24));

    let report: ProcessingReport = serde_json::from_str(
        &fs::read_to_string(&outcome.report_paths.json).unwrap(),
    )
    .unwrap();
    assert_eq!(report.processing_summary.total_images_processed, 12);
    assert_eq!(report.processing_summary.success_rate, "100.0%");
    assert_eq!(report.noise_types_details[&NoiseType::Poisson].processed, 6);
    assert!(outcome.report_paths.text.exists());
}

#[test]
fn test_png_inputs_become_jpeg_outputs() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let codec = ImageCodec::new();
    let rgb = CanonicalImage::new(Array3::from_shape_fn((3, 16, 16), |(b, i, j)| {
        (i * 8 + j * 4 + b * 20) as Sample
    }));
    codec.save(&rgb, input.path().join("drone.png"), None).unwrap();

    let outcome = NoisePipeline::from_input_dir(
        input.path(),
        config(output.path().to_path_buf(), vec![NoiseType::MotionBlur], 2),
    )
    .unwrap()
    .run()
    .unwrap();

    assert_eq!(outcome.stats.total_processed, 2);
    assert!(output
        .path()
        .join("motion_blur")
        .join("drone_motion_blur_level_01.jpg")
        .exists());
}

#[test]
fn test_sixteen_bit_png_inputs_become_jpeg_outputs() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let codec = ImageCodec::new();
    let gray16 = CanonicalImage::new(Array3::from_shape_fn((1, 16, 16), |(_, i, j)| {
        (1000 + i * 2000 + j * 100) as Sample
    }));
    let rgba = CanonicalImage::new(Array3::from_shape_fn((4, 16, 16), |(b, i, j)| {
        (i * 8 + j * 4 + b * 10) as Sample
    }));
    codec.save(&gray16, input.path().join("thermal.png"), None).unwrap();
    codec.save(&rgba, input.path().join("overlay.png"), None).unwrap();

    let outcome = NoisePipeline::from_input_dir(
        input.path(),
        config(output.path().to_path_buf(), vec![NoiseType::Gaussian], 2),
    )
    .unwrap()
    .run()
    .unwrap();

    assert_eq!(outcome.stats.total_processed, 4);
    assert_eq!(outcome.stats.total_failed, 0);
    let noisy = codec
        .load(output.path().join("gaussian").join("thermal_gaussian_level_01.jpg"))
        .unwrap();
    assert_eq!(noisy.shape(), (1, 16, 16));
    assert!(output
        .path()
        .join("gaussian")
        .join("overlay_gaussian_level_02.jpg")
        .exists());
}

#[test]
fn test_empty_input_is_configuration_error() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    fs::write(input.path().join("readme.txt"), "no images here").unwrap();

    let result = NoisePipeline::from_input_dir(
        input.path(),
        config(output.path().join("noisy"), NoiseType::ALL.to_vec(), 10),
    );

    assert!(matches!(result, Err(NoiseError::Configuration(_))));
    assert!(matches!(discover_images(input.path()), Err(NoiseError::Configuration(_))));
    assert!(!output.path().join("noisy").exists());
}

#[test]
fn test_corrupt_file_does_not_stop_the_run() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_inputs(input.path(), &["a.tif", "c.tif"]);
    fs::write(input.path().join("b.tif"), b"truncated").unwrap();

    let mut pipeline = NoisePipeline::from_input_dir(
        input.path(),
        config(output.path().to_path_buf(), vec![NoiseType::Speckle], 1),
    )
    .unwrap();
    let outcome = pipeline.run().unwrap();

    assert_eq!(outcome.state, PipelineState::Completed);
    assert_eq!(outcome.stats.total_processed, 2);
    assert!(outcome.stats.total_failed >= 1);
    assert_eq!(count_files(&output.path().join("speckle")), 2);
    assert!(outcome.report_paths.json.exists());
}

#[test]
fn test_cancellation_stops_between_units() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_inputs(input.path(), &["a.tif", "b.tif"]);

    let mut pipeline = NoisePipeline::from_input_dir(
        input.path(),
        config(output.path().to_path_buf(), vec![NoiseType::Gaussian], 5),
    )
    .unwrap();
    let token = pipeline.cancel_token();

    let outcome = pipeline
        .run_with_progress(|progress| {
            if progress.units_done == 3 {
                token.cancel();
            }
        })
        .unwrap();

    assert_eq!(outcome.state, PipelineState::Cancelled);
    assert_eq!(pipeline.state(), PipelineState::Cancelled);
    assert_eq!(outcome.stats.total_processed, 3);
    assert_eq!(count_files(&output.path().join("gaussian")), 3);
    // the report still covers the partial run
    assert!(outcome.report_paths.json.exists());
}

#[test]
fn test_progress_reaches_total() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_inputs(input.path(), &["a.tif"]);

    let mut pipeline = NoisePipeline::from_input_dir(
        input.path(),
        config(output.path().to_path_buf(), vec![NoiseType::SaltPepper, NoiseType::Atmospheric], 2),
    )
    .unwrap();

    let mut seen = Vec::new();
    pipeline
        .run_with_progress(|progress| seen.push(progress.units_done))
        .unwrap();

    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last().copied(), Some(4));
    assert!(pipeline.run().is_err());
}

#[test]
fn test_seeded_runs_write_identical_outputs() {
    let input = tempfile::tempdir().unwrap();
    write_inputs(input.path(), &["a.tif"]);
    let codec = ImageCodec::new();

    let mut results = Vec::new();
    for _ in 0..2 {
        let output = tempfile::tempdir().unwrap();
        NoisePipeline::from_input_dir(
            input.path(),
            config(output.path().to_path_buf(), vec![NoiseType::IsoNoise], 1),
        )
        .unwrap()
        .run()
        .unwrap();
        let noisy = codec
            .load(output.path().join("iso_noise").join("a_iso_noise_level_01.tif"))
            .unwrap();
        results.push(noisy.data);
    }
    assert_eq!(results[0], results[1]);
}

#[test]
fn test_background_runner_streams_events() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_inputs(input.path(), &["a.tif", "b.tif"]);

    let pipeline = NoisePipeline::from_input_dir(
        input.path(),
        config(output.path().to_path_buf(), vec![NoiseType::Compression], 2),
    )
    .unwrap();

    let handle = spawn_pipeline(pipeline).unwrap();
    let mut last_units = 0;
    let outcome = handle
        .wait_with_progress(|progress| last_units = progress.units_done)
        .unwrap();

    assert_eq!(last_units, 4);
    assert_eq!(outcome.state, PipelineState::Completed);
    assert_eq!(outcome.stats.total_processed, 4);
}

#[test]
fn test_background_runner_can_be_cancelled() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_inputs(input.path(), &["a.tif"]);

    let pipeline = NoisePipeline::from_input_dir(
        input.path(),
        config(output.path().to_path_buf(), vec![NoiseType::Gaussian], 10),
    )
    .unwrap();
    // cancelled before the worker starts: nothing is generated
    pipeline.cancel_token().cancel();

    let handle = spawn_pipeline(pipeline).unwrap();
    let outcome = loop {
        let finished = handle.events().recv().unwrap();
        if let PipelineEvent::Finished(result) = finished {
            break result.unwrap();
        }
    };

    assert_eq!(outcome.state, PipelineState::Cancelled);
    assert_eq!(outcome.stats.total_processed, 0);
    assert!(outcome.report_paths.json.exists());
}

#[test]
fn test_background_runner_keeps_the_error_kind() {
    let input = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    write_inputs(input.path(), &["a.tif"]);
    // a regular file where the output folder should go
    let blocked = scratch.path().join("noisy");
    fs::write(&blocked, b"not a folder").unwrap();

    let pipeline = NoisePipeline::from_input_dir(
        input.path(),
        config(blocked, vec![NoiseType::Gaussian], 1),
    )
    .unwrap();

    let result = spawn_pipeline(pipeline).unwrap().wait();
    assert!(matches!(result, Err(NoiseError::Io(_))), "{:?}", result.map(|o| o.state));
}
