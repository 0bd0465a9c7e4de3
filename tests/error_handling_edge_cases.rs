//! Error handling and edge case tests

use tempfile::TempDir;
use whitebg_remove::{
    flatten_white_to_transparent, remove_background_from_bytes, BackgroundRemovalProcessor,
    ImageIOService, OutputFormat, PixelBuffer, RemovalConfig, RemovalError, RemovalMode,
    SegmentationConfig, Segmenter,
};

#[test]
fn length_mismatch_reports_expected_and_actual() {
    let err = PixelBuffer::new(vec![0; 10], 2, 2, 4).unwrap_err();
    assert!(matches!(err, RemovalError::InvalidBuffer(_)));

    let message = err.to_string();
    assert!(message.contains("16"), "{message}");
    assert!(message.contains("10"), "{message}");
}

#[test]
fn three_channel_buffer_rejected() {
    let buffer = PixelBuffer {
        data: vec![255; 27],
        width: 3,
        height: 3,
        channels: 3,
    };
    let err = whitebg_remove::segment_and_make_transparent(buffer).unwrap_err();
    assert!(err.is_invalid_buffer());
    assert!(err.to_string().contains("alpha"));
}

#[test]
fn overflowing_dimensions_rejected() {
    let buffer = PixelBuffer {
        data: Vec::new(),
        width: u32::MAX,
        height: u32::MAX,
        channels: u8::MAX,
    };
    assert!(buffer.validate().unwrap_err().is_invalid_buffer());
}

#[test]
fn flatten_rejects_invalid_buffer_without_writing() {
    let mut buffer = PixelBuffer {
        data: vec![255; 7],
        width: 2,
        height: 1,
        channels: 4,
    };
    assert!(flatten_white_to_transparent(&mut buffer, 240).is_err());
    assert_eq!(buffer.data, vec![255; 7]);
}

#[test]
fn invalid_configs_rejected() {
    for threshold in [-0.1_f32, 1.0, 2.0, f32::NAN, f32::INFINITY] {
        let config = SegmentationConfig {
            density_threshold: threshold,
            ..Default::default()
        };
        let err = Segmenter::new(config).unwrap_err();
        assert!(
            matches!(err, RemovalError::InvalidConfig(_)),
            "threshold {threshold} gave {err:?}"
        );
    }

    assert!(RemovalConfig::builder().density_threshold(0.0).build().is_ok());
}

#[test]
fn malformed_json_config_rejected() {
    assert!(matches!(
        RemovalConfig::from_json_str("{ not json").unwrap_err(),
        RemovalError::InvalidConfig(_)
    ));
    assert!(RemovalConfig::from_json_str(r#"{ "mode": "erase" }"#).is_err());
    assert!(
        RemovalConfig::from_json_str(r#"{ "segmentation": { "density_threshold": 1.2 } }"#)
            .is_err()
    );
}

#[test]
fn missing_config_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let err = RemovalConfig::from_json_file(temp.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn missing_input_file() {
    let processor = BackgroundRemovalProcessor::new(RemovalConfig::default()).unwrap();
    let err = processor.process_file("/no/such/dir/input.png").unwrap_err();
    assert!(err.to_string().contains("input.png"));
}

#[test]
fn corrupt_input_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.png");
    std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot really").unwrap();

    let processor = BackgroundRemovalProcessor::new(RemovalConfig::default()).unwrap();
    assert!(processor.process_file(&path).is_err());
}

#[tokio::test]
async fn empty_and_garbage_bytes() {
    let config = RemovalConfig::default();
    assert!(remove_background_from_bytes(&[], &config).await.is_err());
    assert!(remove_background_from_bytes(b"GIF89a", &config).await.is_err());
}

#[test]
fn fallback_only_applies_when_enabled() {
    let rgb = PixelBuffer {
        data: vec![255; 4 * 4 * 3],
        width: 4,
        height: 4,
        channels: 3,
    };

    let strict = BackgroundRemovalProcessor::new(RemovalConfig::default()).unwrap();
    assert!(strict.process_buffer(rgb.clone()).unwrap_err().is_invalid_buffer());

    let lenient = BackgroundRemovalProcessor::new(
        RemovalConfig::builder()
            .fallback_to_flatten(true)
            .build()
            .unwrap(),
    )
    .unwrap();
    let result = lenient.process_buffer(rgb).unwrap();
    assert_eq!(result.mode, RemovalMode::Flatten);
    assert_eq!(result.statistics.flattened_pixels, 16);
}

#[test]
fn rgba8_encode_requires_four_channels() {
    let buffer = PixelBuffer {
        data: vec![1, 2, 3, 4, 5],
        width: 1,
        height: 1,
        channels: 5,
    };
    assert!(ImageIOService::encode_buffer(&buffer, OutputFormat::Png).is_err());
    assert!(ImageIOService::encode_buffer(&buffer, OutputFormat::Rgba8).is_err());
}

#[test]
fn one_pixel_images() {
    let white = whitebg_remove::segment_and_make_transparent(PixelBuffer::filled(
        1,
        1,
        [255, 255, 255, 255],
    ))
    .unwrap();
    assert_eq!(white.alpha_at(0), 0);

    let grey = whitebg_remove::segment_and_make_transparent(PixelBuffer::filled(
        1,
        1,
        [128, 128, 128, 255],
    ))
    .unwrap();
    assert_eq!(grey.alpha_at(0), 255);
}
