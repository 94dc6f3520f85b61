use super::*;
use crate::foundation::color::Color32;
use crate::surface::buffer::{MemoryPlacement, Surface};

fn rgb565(w: u32, h: u32) -> Surface {
    Surface::new(w, h, ColorFormat::Rgb565, MemoryPlacement::Dma).unwrap()
}

#[test]
fn fill_programs_registers_and_writes_rectangle() {
    let e = Ge2d::new(Ge2d::default_caps(), Duration::ZERO);
    let s = rgb565(8, 4);
    let red = Color32::rgb(255, 0, 0);
    e.start(&HwOp::Fill {
        dst: &s,
        area: Area::new(2, 1, 5, 2),
        color: red,
    })
    .unwrap();
    assert_eq!(e.poll(), EngineStatus::Done);

    let regs = e.registers();
    assert_eq!(regs.bpp, 16);
    assert_eq!(regs.pitch, 8);
    assert_eq!(regs.size, (4, 2));
    assert_eq!(regs.color, 0xf800);

    for y in 0..4 {
        for x in 0..8 {
            let inside = (2..=5).contains(&x) && (1..=2).contains(&y);
            let want = if inside { red } else { Color32::BLACK };
            assert_eq!(s.pixel(x, y), Some(want), "({x}, {y})");
        }
    }
}

#[test]
fn blit_is_refused() {
    let e = Ge2d::new(Ge2d::default_caps(), Duration::ZERO);
    let a = rgb565(4, 4);
    let b = rgb565(4, 4);
    let err = e
        .start(&HwOp::Blit {
            src: &a,
            src_area: a.bounds(),
            dst: &b,
            dst_pos: crate::foundation::core::Point::new(0, 0),
            opa: 255,
        })
        .unwrap_err();
    assert!(matches!(err, EngineFault::Unsupported(_)));
    assert_eq!(e.poll(), EngineStatus::Idle);
}

#[test]
fn rgb888_destination_is_refused() {
    let e = Ge2d::new(Ge2d::default_caps(), Duration::ZERO);
    let s = Surface::new(4, 4, ColorFormat::Rgb888, MemoryPlacement::Dma).unwrap();
    let err = e
        .start(&HwOp::Fill {
            dst: &s,
            area: s.bounds(),
            color: Color32::WHITE,
        })
        .unwrap_err();
    assert!(matches!(err, EngineFault::Unsupported(_)));
}
