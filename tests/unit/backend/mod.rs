use super::*;
use crate::foundation::color::{Color32, ColorFormat};
use crate::surface::buffer::MemoryPlacement;
use crate::task::model::{FillDsc, TaskState};

#[test]
fn dispatch_outcome_codes() {
    assert_eq!(DispatchOutcome::Busy.as_code(), 0);
    assert_eq!(DispatchOutcome::Taken.as_code(), 1);
    assert_eq!(DispatchOutcome::NoTask.as_code(), -1);
}

#[test]
fn claim_is_exclusive_and_draw_area_is_clipped() {
    let target = Arc::new(Surface::new(10, 10, ColorFormat::Rgb565, MemoryPlacement::Dma).unwrap());
    let task = DrawTask::fill(Area::new(5, 5, 20, 20), FillDsc::solid(Color32::WHITE))
        .with_clip(Area::new(0, 0, 12, 12));
    let buf_area = Area::new(0, 0, 9, 9);

    let claimed = ClaimedTask::claim(&task, Arc::clone(&target), buf_area).unwrap();
    assert!(ClaimedTask::claim(&task, target, buf_area).is_none());
    assert_eq!(task.state(), TaskState::InProgress);
    assert_eq!(claimed.draw_area(), Some(Area::new(5, 5, 9, 9)));

    claimed.complete();
    assert_eq!(task.state(), TaskState::Ready);
}

#[test]
fn backend_id_none_is_zero() {
    assert_eq!(BackendId::NONE, BackendId::default());
    assert_eq!(BackendId(3).to_string(), "#3");
}
