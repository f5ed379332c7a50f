use std::cell::RefCell;
use std::rc::Rc;

use quilt_display::render::compositor::{
    ViewObserver, notify_observers, observer_calls, view_schedule,
};
use quilt_display::tiling::{PRESETS, QuiltLayout, angle_at_view, tile_rect};

#[test]
fn schedule_walks_every_view_in_order_with_its_angle_and_rect() {
    let tiling = PRESETS[0].tiling;
    let layout = QuiltLayout::new(tiling);
    let cone = 40.0;

    let schedule = view_schedule(tiling, &layout, cone);
    assert_eq!(schedule.len() as u32, layout.num_views);
    for (i, step) in schedule.iter().enumerate() {
        assert_eq!(step.view, i as u32);
        assert_eq!(step.horizontal_deg, angle_at_view(step.view, layout.num_views, cone));
        assert_eq!(step.rect, tile_rect(step.view, tiling, &layout));
    }
}

#[test]
fn observers_see_each_view_once_then_the_sentinel() {
    let calls = observer_calls(32, false);
    assert_eq!(calls.len(), 33);
    for (i, call) in calls.iter().take(32).enumerate() {
        assert_eq!(*call, (i as u32, 32));
    }
    assert_eq!(*calls.last().unwrap(), (32, 32));
}

#[test]
fn a_single_view_composite_still_gets_its_sentinel() {
    assert_eq!(observer_calls(1, false), vec![(0, 1), (1, 1)]);
}

#[test]
fn the_override_path_emits_no_observer_calls() {
    assert!(observer_calls(32, true).is_empty());
    assert!(observer_calls(1, true).is_empty());
}

#[test]
fn observers_fire_in_subscription_order_for_every_call() {
    let log: Rc<RefCell<Vec<(u8, u32)>>> = Rc::new(RefCell::new(Vec::new()));

    let first = Rc::clone(&log);
    let second = Rc::clone(&log);
    let mut observers: Vec<ViewObserver> = vec![
        Box::new(move |view, _| first.borrow_mut().push((1, view))),
        Box::new(move |view, _| second.borrow_mut().push((2, view))),
    ];

    let num_views = 4;
    for (view, total) in observer_calls(num_views, false) {
        notify_observers(&mut observers, view, total);
    }

    let log = log.borrow();
    // two entries per call, five calls (four views plus the sentinel)
    assert_eq!(log.len(), 10);
    for (i, pair) in log.chunks(2).enumerate() {
        let view = i as u32;
        assert_eq!(pair, [(1, view), (2, view)]);
    }
}
