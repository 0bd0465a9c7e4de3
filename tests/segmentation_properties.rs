//! Behavioral tests for the segmentation engine on hand-built buffers

use whitebg_remove::{
    segment_and_make_transparent, PixelBuffer, PixelDecision, SegmentationConfig, Segmenter,
};

const WHITE: [u8; 4] = [255, 255, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

/// Build a buffer from rows of `#` (white) and `.` (black)
fn from_art(rows: &[&str]) -> PixelBuffer {
    let height = rows.len() as u32;
    let width = rows[0].len() as u32;
    let data = rows
        .iter()
        .flat_map(|row| row.chars())
        .flat_map(|c| if c == '#' { WHITE } else { BLACK })
        .collect();
    PixelBuffer::new(data, width, height, 4).unwrap()
}

/// Alpha channel as rows of `0` (cleared) and `1` (kept)
fn alpha_art(buffer: &PixelBuffer) -> Vec<String> {
    buffer
        .data
        .chunks_exact(usize::from(buffer.channels))
        .map(|px| if px[3] == 0 { '0' } else { '1' })
        .collect::<Vec<_>>()
        .chunks(buffer.width as usize)
        .map(|row| row.iter().collect())
        .collect()
}

/// Deterministic pseudo-random RGBA buffer biased towards near-white pixels
fn noisy_buffer(width: u32, height: u32, seed: u64) -> PixelBuffer {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) as u8
    };

    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        if next() % 3 == 0 {
            data.extend_from_slice(&[next(), next(), next(), next()]);
        } else {
            data.extend_from_slice(&[241 + next() % 15, 241 + next() % 15, 241 + next() % 15, 255]);
        }
    }
    PixelBuffer::new(data, width, height, 4).unwrap()
}

#[test]
fn white_image_with_black_center() {
    let input = from_art(&["#####", "#####", "##.##", "#####", "#####"]);
    let output = segment_and_make_transparent(input).unwrap();

    assert_eq!(
        alpha_art(&output),
        vec!["00000", "00000", "00100", "00000", "00000"]
    );
    assert_eq!(output.rgb_at(output.pixel_index(2, 2)), [0, 0, 0]);
}

#[test]
fn fully_white_image_becomes_fully_transparent() {
    let output = segment_and_make_transparent(PixelBuffer::filled(16, 9, WHITE)).unwrap();
    assert!(output.data.chunks_exact(4).all(|px| px[3] == 0));
    assert!(output.data.chunks_exact(4).all(|px| px[..3] == [255, 255, 255]));
}

#[test]
fn fully_dark_image_is_unchanged() {
    let input = PixelBuffer::filled(8, 8, [12, 200, 90, 255]);
    let output = segment_and_make_transparent(input.clone()).unwrap();
    assert_eq!(output, input);
}

#[test]
fn corridor_reached_from_border_is_removed() {
    // Interior corridor pixels have too few white neighbors for the density
    // pass; only the flood fill can reach them
    let input = from_art(&[
        ".......", ".......", ".......", "####...", "...#...", "...#...", ".......",
    ]);
    let mask = Segmenter::default().segment(&input).unwrap();

    assert_eq!(mask.decision_at(0, 3), Some(PixelDecision::Both));
    for (x, y) in [(1, 3), (2, 3), (3, 3), (3, 4), (3, 5)] {
        assert_eq!(
            mask.decision_at(x, y),
            Some(PixelDecision::Connectivity),
            "pixel ({x}, {y})"
        );
    }
    assert_eq!(mask.transparent_count(), 6);
}

#[test]
fn enclosed_hole_uses_density_only() {
    let input = from_art(&[
        "#######", "#.....#", "#.###.#", "#.###.#", "#.###.#", "#.....#", "#######",
    ]);
    let mask = Segmenter::default().segment(&input).unwrap();

    // 8/8 background neighbors
    assert_eq!(mask.decision_at(3, 3), Some(PixelDecision::Density));
    // 5/8 on the hole's edges
    assert_eq!(mask.decision_at(3, 2), Some(PixelDecision::Density));
    assert_eq!(mask.decision_at(2, 3), Some(PixelDecision::Density));
    // 3/8 in the hole's corners
    assert_eq!(mask.decision_at(2, 2), Some(PixelDecision::Opaque));
    assert_eq!(mask.decision_at(4, 4), Some(PixelDecision::Opaque));
    // Outer frame is reached by both passes
    assert_eq!(mask.decision_at(0, 0), Some(PixelDecision::Both));
    assert_eq!(mask.decision_at(1, 1), Some(PixelDecision::Opaque));
}

#[test]
fn diagonal_contact_does_not_connect() {
    let input = from_art(&[
        "#....", ".#...", ".....", ".....", ".....",
    ]);
    let output = segment_and_make_transparent(input).unwrap();
    let alpha = alpha_art(&output);

    assert_eq!(&alpha[0][..2], "01");
    assert_eq!(&alpha[1][..2], "11");
}

#[test]
fn threshold_is_strict() {
    let mut input = PixelBuffer::filled(3, 3, WHITE);
    // Border pixel with one channel exactly at the threshold
    input.data[0..3].copy_from_slice(&[240, 255, 255]);
    let output = segment_and_make_transparent(input).unwrap();

    assert_eq!(output.alpha_at(0), 255);
    assert_eq!(output.alpha_at(1), 0);
}

#[test]
fn non_background_alpha_is_preserved() {
    let mut input = PixelBuffer::filled(5, 5, WHITE);
    let idx = input.pixel_index(2, 2);
    let offset = input.byte_offset(idx);
    input.data[offset..offset + 4].copy_from_slice(&[100, 100, 100, 200]);

    let output = segment_and_make_transparent(input).unwrap();
    assert_eq!(&output.data[offset..offset + 4], &[100, 100, 100, 200]);
}

#[test]
fn only_alpha_of_background_pixels_changes() {
    let input = noisy_buffer(37, 23, 7);
    let output = segment_and_make_transparent(input.clone()).unwrap();

    for (before, after) in input.data.chunks_exact(4).zip(output.data.chunks_exact(4)) {
        assert_eq!(before[..3], after[..3]);
        if after[3] != before[3] {
            assert_eq!(after[3], 0);
            assert!(before[..3].iter().all(|&c| c > 240));
        }
    }
}

#[test]
fn segmentation_is_deterministic() {
    let input = noisy_buffer(64, 48, 42);
    let first = segment_and_make_transparent(input.clone()).unwrap();
    let second = segment_and_make_transparent(input).unwrap();
    assert_eq!(first, second);
}

#[test]
fn sequential_and_parallel_agree() {
    let input = noisy_buffer(101, 67, 3);
    let sequential = Segmenter::new(SegmentationConfig {
        parallel: false,
        ..Default::default()
    })
    .unwrap();
    let parallel = Segmenter::new(SegmentationConfig {
        parallel: true,
        ..Default::default()
    })
    .unwrap();

    assert_eq!(
        sequential.segment(&input).unwrap(),
        parallel.segment(&input).unwrap()
    );
}

#[test]
fn single_row_image_is_all_border() {
    let input = from_art(&["##.#"]);
    let output = segment_and_make_transparent(input).unwrap();
    assert_eq!(alpha_art(&output), vec!["0010"]);
}

#[test]
fn extra_channels_are_left_alone() {
    let data = [255, 255, 255, 255, 77].repeat(9);
    let input = PixelBuffer::new(data, 3, 3, 5).unwrap();
    let output = segment_and_make_transparent(input).unwrap();

    for px in output.data.chunks_exact(5) {
        assert_eq!(px, &[255, 255, 255, 0, 77]);
    }
}

#[test]
fn invalid_buffers_are_rejected_untouched() {
    let segmenter = Segmenter::default();

    let mut short = PixelBuffer {
        data: vec![255; 15],
        width: 2,
        height: 2,
        channels: 4,
    };
    let err = segmenter.apply(&mut short).unwrap_err();
    assert!(err.is_invalid_buffer());
    assert_eq!(short.data, vec![255; 15]);

    let mut rgb = PixelBuffer {
        data: vec![255; 12],
        width: 2,
        height: 2,
        channels: 3,
    };
    assert!(segmenter.apply(&mut rgb).unwrap_err().is_invalid_buffer());
    assert_eq!(rgb.data, vec![255; 12]);
}

#[test]
fn empty_image_is_a_no_op() {
    let input = PixelBuffer::new(Vec::new(), 0, 0, 4).unwrap();
    let output = segment_and_make_transparent(input).unwrap();
    assert!(output.data.is_empty());
}
