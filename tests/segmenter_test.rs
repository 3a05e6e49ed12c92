// Phase 4: 前景切り出しと背景ノックアウトのテスト

use image::{Rgba, RgbaImage};

use layered_pdf::error::LayerError;
use layered_pdf::layers::LayerRole;
use layered_pdf::layers::segmenter::{
    FillStyle, KnockoutColor, Segmenter, SegmenterConfig, extract_foreground, grown_rects,
    knockout_rects, make_background,
};
use layered_pdf::raster::histogram::{ClassifyParams, Histogram};
use layered_pdf::raster::rect::Rect;

const WHITE: Rgba<u8> = Rgba([0xFF, 0xFF, 0xFF, 0xFF]);
const BLACK: Rgba<u8> = Rgba([0x00, 0x00, 0x00, 0xFF]);
const RED: Rgba<u8> = Rgba([0xFF, 0x00, 0x00, 0xFF]);

fn r(x0: i32, y0: i32, x1: i32, y1: i32) -> Rect {
    Rect::new(x0, y0, x1, y1).expect("valid rect")
}

/// 100x100 white page with a black square at (10,10)-(30,30).
fn page_with_square() -> RgbaImage {
    RgbaImage::from_fn(100, 100, |x, y| {
        if (10..30).contains(&x) && (10..30).contains(&y) {
            BLACK
        } else {
            WHITE
        }
    })
}

// ============================================================
// 1. extract_foreground
// ============================================================

#[test]
fn test_foreground_crop_matches_source() {
    let src = page_with_square();
    let layers = extract_foreground(&src, &[r(10, 10, 30, 30)]).expect("inside");
    assert_eq!(layers.len(), 1);
    let fg = &layers[0];
    assert_eq!(fg.role, LayerRole::Foreground(0));
    assert_eq!(fg.raster.dimensions(), (20, 20));
    assert_eq!(fg.placement, r(10, 10, 30, 30));
    assert!(fg.raster.pixels().all(|p| *p == BLACK), "crop is the black square");
}

#[test]
fn test_foreground_overlapping_rects_are_independent() {
    let src = RgbaImage::from_fn(40, 40, |x, y| Rgba([x as u8, y as u8, 0, 0xFF]));
    let layers = extract_foreground(&src, &[r(0, 0, 20, 20), r(10, 10, 30, 30)]).expect("inside");
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[1].role, LayerRole::Foreground(1));
    // 重なり領域の同じ画素が両方のクロップに現れる
    assert_eq!(layers[0].raster.get_pixel(15, 15), src.get_pixel(15, 15));
    assert_eq!(layers[1].raster.get_pixel(5, 5), src.get_pixel(15, 15));
}

#[test]
fn test_foreground_outside_raster_is_invalid_geometry() {
    let src = page_with_square();
    let result = extract_foreground(&src, &[r(90, 90, 110, 100)]);
    assert!(matches!(result, Err(LayerError::InvalidGeometry(_))));
}

#[test]
fn test_foreground_empty_rect_yields_empty_crop() {
    let src = page_with_square();
    let layers = extract_foreground(&src, &[r(5, 5, 5, 20)]).expect("empty is allowed");
    assert_eq!(layers[0].raster.width(), 0);
}

// ============================================================
// 2. make_background
// ============================================================

#[test]
fn test_background_knockout_fills_only_inside() {
    let src = page_with_square();
    let bg = make_background(&src, &[r(12, 12, 28, 28)], WHITE);
    assert_eq!(bg.dimensions(), (100, 100));
    assert_eq!(*bg.get_pixel(20, 20), WHITE);
    assert_eq!(*bg.get_pixel(12, 12), WHITE);
    // 縮小した分の縁は黒のまま残る
    assert_eq!(*bg.get_pixel(10, 10), BLACK);
    assert_eq!(*bg.get_pixel(29, 20), BLACK);
    assert_eq!(*bg.get_pixel(50, 50), WHITE);
}

#[test]
fn test_background_knockout_is_clipped() {
    let src = page_with_square();
    let bg = make_background(&src, &[r(-10, -10, 15, 15)], RED);
    assert_eq!(*bg.get_pixel(0, 0), RED);
    assert_eq!(*bg.get_pixel(14, 14), RED);
    assert_eq!(*bg.get_pixel(15, 15), BLACK);
}

#[test]
fn test_background_without_knockouts_is_a_copy() {
    let src = page_with_square();
    let bg = make_background(&src, &[], RED);
    assert_eq!(bg, src);
}

// ============================================================
// 3. Segmenter
// ============================================================

#[test]
fn test_segment_shrinks_knockouts_by_dilation() {
    let seg = Segmenter::new(SegmenterConfig::default());
    let out = seg
        .segment(&page_with_square(), &[r(10, 10, 30, 30)], FillStyle::Knockout)
        .expect("segment");

    assert_eq!(out.knockouts, vec![r(12, 12, 28, 28)]);
    assert_eq!(out.background.role, LayerRole::Background);
    assert_eq!(out.background.placement, r(0, 0, 100, 100));
    assert_eq!(*out.background.raster.get_pixel(20, 20), WHITE);
    assert_eq!(*out.background.raster.get_pixel(11, 11), BLACK);

    let hist = Histogram::from_pixels(&out.background.raster);
    assert_eq!(hist.distinct_colors(), 2);
    assert!(hist.satisfies(&ClassifyParams::BILEVEL));

    assert_eq!(out.foreground.len(), 1);
    assert_eq!(out.foreground[0].placement, r(10, 10, 30, 30));
    assert!(out.foreground[0].raster.pixels().all(|p| *p == BLACK));
}

#[test]
fn test_segment_without_rects_keeps_source() {
    let src = page_with_square();
    let out = Segmenter::new(SegmenterConfig::default())
        .segment(&src, &[], FillStyle::Knockout)
        .expect("segment");
    assert_eq!(out.background.raster, src);
    assert!(out.foreground.is_empty());
    assert!(out.knockouts.is_empty());
}

#[test]
fn test_segment_highlight_paints_knockouts() {
    let seg = Segmenter::new(SegmenterConfig::default());
    let out = seg
        .segment(&page_with_square(), &[r(10, 10, 30, 30)], FillStyle::Highlight)
        .expect("segment");
    assert_eq!(*out.background.raster.get_pixel(20, 20), Rgba([0, 0, 0xFF, 0xFF]));
}

#[test]
fn test_segment_dominant_knockout_color() {
    let src = RgbaImage::from_fn(50, 50, |x, y| {
        if (20..30).contains(&x) && (20..30).contains(&y) {
            BLACK
        } else {
            RED
        }
    });
    let config = SegmenterConfig {
        knockout_color: KnockoutColor::Dominant,
        dilation: 0,
        ..SegmenterConfig::default()
    };
    let out = Segmenter::new(config)
        .segment(&src, &[r(20, 20, 30, 30)], FillStyle::Knockout)
        .expect("segment");
    assert_eq!(*out.background.raster.get_pixel(25, 25), RED);
}

#[test]
fn test_segment_explicit_knockout_color() {
    let config = SegmenterConfig {
        knockout_color: KnockoutColor::Rgb([1, 2, 3]),
        ..SegmenterConfig::default()
    };
    let out = Segmenter::new(config)
        .segment(&page_with_square(), &[r(10, 10, 30, 30)], FillStyle::Knockout)
        .expect("segment");
    assert_eq!(*out.background.raster.get_pixel(20, 20), Rgba([1, 2, 3, 0xFF]));
}

#[test]
fn test_segment_foreground_grow_is_clipped() {
    let config = SegmenterConfig {
        foreground_grow: 5,
        ..SegmenterConfig::default()
    };
    let out = Segmenter::new(config)
        .segment(&page_with_square(), &[r(2, 10, 30, 30)], FillStyle::Knockout)
        .expect("segment");
    assert_eq!(out.foreground[0].placement, r(0, 5, 35, 35));
    assert_eq!(out.foreground[0].raster.dimensions(), (35, 30));
}

#[test]
fn test_segment_rect_outside_is_invalid_geometry() {
    let seg = Segmenter::new(SegmenterConfig::default());
    let result = seg.segment(&page_with_square(), &[r(80, 80, 120, 90)], FillStyle::Knockout);
    match result {
        Err(LayerError::InvalidGeometry(msg)) => assert!(msg.contains("rect #0"), "got: {msg}"),
        Err(other) => panic!("expected InvalidGeometry, got {other:?}"),
        Ok(_) => panic!("expected InvalidGeometry"),
    }
}

#[test]
fn test_segment_rect_too_small_for_dilation() {
    let seg = Segmenter::new(SegmenterConfig::default());
    let result = seg.segment(&page_with_square(), &[r(10, 10, 13, 30)], FillStyle::Knockout);
    assert!(matches!(result, Err(LayerError::InvalidGeometry(_))));
}

#[test]
fn test_segment_empty_rect_has_no_knockout() {
    // 既定の dilation 2 でも空矩形は縮小検査の対象外
    let seg = Segmenter::new(SegmenterConfig::default());
    let out = seg
        .segment(
            &page_with_square(),
            &[r(40, 40, 40, 60), r(10, 10, 30, 30)],
            FillStyle::Knockout,
        )
        .expect("empty rect is not shrunk");
    assert_eq!(out.knockouts, vec![r(12, 12, 28, 28)]);
    assert_eq!(out.foreground.len(), 2);
    assert!(out.foreground[0].placement.is_empty());
    assert_eq!(out.foreground[1].placement, r(10, 10, 30, 30));
}

#[test]
fn test_knockout_and_grown_rects_skip_empty() {
    let rects = [r(5, 5, 5, 9), r(10, 10, 20, 20)];
    assert_eq!(knockout_rects(&rects, 2).expect("shrink"), vec![r(12, 12, 18, 18)]);
    assert_eq!(
        grown_rects(&rects, 3).expect("grow"),
        vec![r(5, 5, 5, 9), r(7, 7, 23, 23)]
    );

    match knockout_rects(&[r(0, 0, 0, 0), r(0, 0, 3, 30)], 2) {
        Err(LayerError::InvalidGeometry(msg)) => assert!(msg.contains("rect #1"), "got: {msg}"),
        other => panic!("expected InvalidGeometry, got {other:?}"),
    }
}
