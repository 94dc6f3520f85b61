use super::*;

#[test]
fn packed_stride_matches_row() {
    let s = Surface::new(10, 4, ColorFormat::Rgb565, MemoryPlacement::Dma).unwrap();
    assert_eq!(s.stride(), 20);
    assert_eq!(s.pixels().len(), 80);
    assert_eq!(s.bounds(), Area::new(0, 0, 9, 3));
}

#[test]
fn stride_smaller_than_row_is_rejected() {
    let err = Surface::with_stride(10, 4, 19, ColorFormat::Rgb565, MemoryPlacement::Dma);
    assert!(err.is_err());
}

#[test]
fn clear_skips_row_padding() {
    let s = Surface::with_stride(2, 2, 8, ColorFormat::Rgb565, MemoryPlacement::Cpu).unwrap();
    s.clear(Color32::WHITE);
    let px = s.pixels();
    assert_eq!(&px[0..4], &[0xff; 4]);
    assert_eq!(&px[4..8], &[0; 4]);
}

#[test]
fn rgba8_roundtrip_through_argb() {
    let rgba = [1u8, 2, 3, 4, 5, 6, 7, 8];
    let s = Surface::from_rgba8(2, 1, ColorFormat::Argb8888, MemoryPlacement::Dma, &rgba).unwrap();
    assert_eq!(s.to_rgba8(), rgba.to_vec());
    assert_eq!(s.pixel(1, 0), Some(Color32::new(8, 5, 6, 7)));
    assert_eq!(s.pixel(2, 0), None);
}

#[test]
fn digest_ignores_padding_bytes() {
    let a = Surface::with_stride(2, 2, 8, ColorFormat::Rgb565, MemoryPlacement::Dma).unwrap();
    let b = Surface::with_stride(2, 2, 8, ColorFormat::Rgb565, MemoryPlacement::Dma).unwrap();
    b.pixels_mut()[6] = 0xaa;
    assert_eq!(a.digest(), b.digest());
    b.pixels_mut()[0] = 0xaa;
    assert_ne!(a.digest(), b.digest());
}

#[test]
fn surface_ids_are_unique() {
    let a = Surface::new(1, 1, ColorFormat::L8, MemoryPlacement::Cpu).unwrap();
    let b = Surface::new(1, 1, ColorFormat::L8, MemoryPlacement::Cpu).unwrap();
    assert_ne!(a.id(), b.id());
}
