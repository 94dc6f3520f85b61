use super::*;

#[test]
fn rgb565_packs_high_bits() {
    assert_eq!(Color32::rgb(255, 0, 0).to_rgb565(), 0xf800);
    assert_eq!(Color32::rgb(0, 255, 0).to_rgb565(), 0x07e0);
    assert_eq!(Color32::rgb(0, 0, 255).to_rgb565(), 0x001f);
    assert_eq!(Color32::from_rgb565(0xffff), Color32::WHITE);
}

#[test]
fn encode_decode_preserves_representable_colors() {
    let c = Color32::new(200, 10, 20, 30);
    for format in [ColorFormat::Rgb888, ColorFormat::Argb8888, ColorFormat::Xrgb8888] {
        let mut px = [0u8; 4];
        encode_pixel(format, c, &mut px);
        let back = decode_pixel(format, &px);
        assert_eq!((back.r, back.g, back.b), (10, 20, 30), "{format:?}");
    }
    let mut px = [0u8; 4];
    encode_pixel(ColorFormat::Argb8888, c, &mut px);
    assert_eq!(px, [30, 20, 10, 200]);
}

#[test]
fn xrgb_writes_opaque_padding() {
    let mut px = [0u8; 4];
    encode_pixel(ColorFormat::Xrgb8888, Color32::new(0, 1, 2, 3), &mut px);
    assert_eq!(px[3], 0xff);
}

#[test]
fn blend_cover_replaces_and_transparent_keeps() {
    let mut px = [0u8; 2];
    encode_pixel(ColorFormat::Rgb565, Color32::BLACK, &mut px);
    blend_pixel(ColorFormat::Rgb565, &mut px, Color32::WHITE, OPA_TRANSP);
    assert_eq!(decode_pixel(ColorFormat::Rgb565, &px), Color32::BLACK);
    blend_pixel(ColorFormat::Rgb565, &mut px, Color32::WHITE, OPA_COVER);
    assert_eq!(decode_pixel(ColorFormat::Rgb565, &px), Color32::WHITE);
}

#[test]
fn blend_half_over_opaque_mixes() {
    let mut px = [0u8; 4];
    encode_pixel(ColorFormat::Xrgb8888, Color32::BLACK, &mut px);
    blend_pixel(ColorFormat::Xrgb8888, &mut px, Color32::WHITE, 128);
    let out = decode_pixel(ColorFormat::Xrgb8888, &px);
    assert_eq!(out.r, 128);
}

#[test]
fn blend_over_transparent_argb_keeps_source_color() {
    let mut px = [0u8; 4];
    blend_pixel(
        ColorFormat::Argb8888,
        &mut px,
        Color32::new(128, 200, 100, 50),
        OPA_COVER,
    );
    let out = decode_pixel(ColorFormat::Argb8888, &px);
    assert_eq!(out, Color32::new(128, 200, 100, 50));
}

#[test]
fn fill_word_matches_format_width() {
    let c = Color32::rgb(255, 255, 255);
    assert_eq!(c.fill_word(ColorFormat::Rgb565), 0xffff);
    assert_eq!(c.fill_word(ColorFormat::Argb8888), 0xffff_ffff);
    assert_eq!(
        Color32::new(0, 1, 2, 3).fill_word(ColorFormat::Xrgb8888),
        0xff01_0203
    );
}
