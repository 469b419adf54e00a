use dme_events::{
    Context, Cookie, CriticalRegion, ErrorCode, EventKind, EventLoop, EventLoopBuilder,
    HandlerResult, RunState,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn counter(event_loop: &mut EventLoop, kind: EventKind) -> Rc<Cell<u32>> {
    let count = Rc::new(Cell::new(0));
    let count_clone = count.clone();

    event_loop
        .register(kind, move |_ctx: &mut Context, _cookie: Cookie| {
            count_clone.set(count_clone.get() + 1);
            Ok(())
        })
        .expect("register counter");

    count
}

#[test]
fn test_dispatch_now_invokes_only_the_bound_handler() {
    let mut event_loop = EventLoop::default();
    let seen = Rc::new(RefCell::new(Vec::new()));

    for kind in EventKind::ALL.into_iter().filter(|k| k.is_registrable()) {
        let seen_clone = seen.clone();
        event_loop
            .register(kind, move |_ctx: &mut Context, cookie: Cookie| {
                seen_clone.borrow_mut().push((kind, cookie.take::<u32>()));
                Ok(())
            })
            .expect("register");
    }

    let result = event_loop.dispatch_now(EventKind::Sync, Cookie::new(7u32));

    assert_eq!(result, Ok(()));
    assert_eq!(*seen.borrow(), vec![(EventKind::Sync, Some(7))]);
}

#[test]
fn test_internal_and_invalid_kinds_cannot_be_registered() {
    let mut event_loop = EventLoop::default();

    for kind in [EventKind::PacketIn, EventKind::Invalid] {
        let result = event_loop.register(kind, |_ctx: &mut Context, _cookie: Cookie| Ok(()));
        assert_eq!(result, Err(ErrorCode::Misconfigured));
    }

    // Invalid still resolves to the fail-fast default.
    assert_eq!(
        event_loop.dispatch_now(EventKind::Invalid, Cookie::empty()),
        Err(ErrorCode::Unhandled)
    );
    assert!(event_loop.exit_requested());
}

#[test]
fn test_unregistered_kind_is_fatal() {
    let mut event_loop = EventLoop::default();
    event_loop.enqueue(EventKind::PeerMsgIn, Cookie::empty());

    let outcome = event_loop.run();

    assert_eq!(outcome, Err(ErrorCode::Unhandled));
    assert_eq!(event_loop.last_error(), Some(ErrorCode::Unhandled));
    assert_eq!(event_loop.state(), RunState::Stopped);
}

#[test]
fn test_rebinding_replaces_previous_handler() {
    let mut event_loop = EventLoop::default();
    let first = counter(&mut event_loop, EventKind::Sync);
    let second = counter(&mut event_loop, EventKind::Sync);

    event_loop.dispatch_now(EventKind::Sync, Cookie::empty()).unwrap();

    assert_eq!(first.get(), 0);
    assert_eq!(second.get(), 1);
}

#[test]
fn test_enqueued_events_are_delivered_in_order() {
    let mut event_loop = EventLoop::default();
    let order = Rc::new(RefCell::new(Vec::new()));

    for kind in [EventKind::Sync, EventKind::PeriodicWork] {
        let order_clone = order.clone();
        event_loop
            .register(kind, move |_ctx: &mut Context, cookie: Cookie| {
                order_clone.borrow_mut().push(cookie.take::<u32>().unwrap_or(0));
                Ok(())
            })
            .unwrap();
    }

    event_loop.enqueue(EventKind::PeriodicWork, Cookie::new(1u32));
    event_loop.enqueue(EventKind::Sync, Cookie::new(2u32));
    event_loop.enqueue(EventKind::PeriodicWork, Cookie::new(3u32));

    assert_eq!(event_loop.run_pending(), 3);
    assert_eq!(*order.borrow(), vec![1, 2, 3]);
}

#[test]
fn test_event_enqueued_by_handler_runs_after_it_returns() {
    let mut event_loop = EventLoop::default();
    let log = Rc::new(RefCell::new(Vec::new()));

    let log_sync = log.clone();
    event_loop
        .register(EventKind::Sync, move |ctx: &mut Context, _cookie: Cookie| {
            log_sync.borrow_mut().push("sync:start");
            ctx.enqueue(EventKind::PeriodicWork, Cookie::empty());
            log_sync.borrow_mut().push("sync:end");
            Ok(())
        })
        .unwrap();

    let log_work = log.clone();
    event_loop
        .register(EventKind::PeriodicWork, move |_ctx: &mut Context, _cookie: Cookie| {
            log_work.borrow_mut().push("work");
            Ok(())
        })
        .unwrap();

    event_loop.enqueue(EventKind::Sync, Cookie::empty());

    event_loop.turn();
    assert_eq!(*log.borrow(), vec!["sync:start", "sync:end"]);
    assert_eq!(event_loop.context().pending_events(), 1);

    event_loop.turn();
    assert_eq!(*log.borrow(), vec!["sync:start", "sync:end", "work"]);
}

#[test]
fn test_fatal_result_stops_before_pending_events() {
    let mut event_loop = EventLoop::default();
    event_loop
        .register(EventKind::Sync, |_ctx: &mut Context, _cookie: Cookie| {
            Err(ErrorCode::Fatal)
        })
        .unwrap();
    let later = counter(&mut event_loop, EventKind::PeriodicWork);

    event_loop.enqueue(EventKind::Sync, Cookie::empty());
    event_loop.enqueue(EventKind::PeriodicWork, Cookie::empty());

    assert_eq!(event_loop.run(), Err(ErrorCode::Fatal));
    assert_eq!(later.get(), 0);
    assert_eq!(event_loop.context().pending_events(), 1);
    assert_eq!(event_loop.run_pending(), 0);
}

#[test]
fn test_non_fatal_result_keeps_running() {
    let mut event_loop = EventLoop::default();
    event_loop
        .register(EventKind::Sync, |_ctx: &mut Context, _cookie: Cookie| {
            Err(ErrorCode::Failed)
        })
        .unwrap();
    let later = counter(&mut event_loop, EventKind::PeriodicWork);

    event_loop.enqueue(EventKind::Sync, Cookie::empty());
    event_loop.enqueue(EventKind::PeriodicWork, Cookie::empty());

    assert_eq!(event_loop.run_pending(), 2);
    assert_eq!(later.get(), 1);
    assert_eq!(event_loop.last_error(), Some(ErrorCode::Failed));
    assert!(!event_loop.exit_requested());
}

#[test]
fn test_end_of_run_stops_the_loop() {
    let mut event_loop = EventLoop::default();
    let syncs = counter(&mut event_loop, EventKind::Sync);

    event_loop.enqueue(EventKind::Sync, Cookie::empty());
    event_loop.enqueue(EventKind::EndOfRun, Cookie::empty());
    event_loop.enqueue(EventKind::Sync, Cookie::empty());

    assert_eq!(event_loop.run(), Ok(()));
    assert_eq!(syncs.get(), 1);
    assert_eq!(event_loop.tick(), 2);
}

#[test]
fn test_custom_end_of_run_handler_still_stops() {
    let mut event_loop = EventLoop::default();
    let teardowns = counter(&mut event_loop, EventKind::EndOfRun);

    event_loop.enqueue(EventKind::EndOfRun, Cookie::empty());

    assert_eq!(event_loop.run(), Ok(()));
    assert_eq!(teardowns.get(), 1);
}

#[test]
fn test_run_after_fatal_dispatch_returns_immediately() {
    let mut event_loop = EventLoop::default();
    let syncs = counter(&mut event_loop, EventKind::Sync);

    let _ = event_loop.dispatch_now(EventKind::ExitedCriticalRegion, Cookie::empty());
    event_loop.enqueue(EventKind::Sync, Cookie::empty());

    assert_eq!(event_loop.run(), Err(ErrorCode::Unhandled));
    assert_eq!(syncs.get(), 0);
}

struct FreeRegion {
    queued: usize,
}

impl CriticalRegion for FreeRegion {
    fn is_idle(&self) -> bool {
        true
    }

    fn is_free(&self) -> bool {
        true
    }

    fn is_sane(&self) -> bool {
        true
    }

    fn pending_count(&self) -> usize {
        self.queued
    }
}

fn want_region(ctx: &mut Context, _cookie: Cookie) -> HandlerResult {
    let region = ctx.critical_region().ok_or(ErrorCode::Fatal)?;
    if !region.is_sane() {
        return Err(ErrorCode::Fatal);
    }

    if region.is_free() && region.pending_count() == 0 {
        ctx.enqueue(EventKind::EnteredCriticalRegion, Cookie::empty());
    }

    Ok(())
}

#[test]
fn test_handlers_can_query_the_critical_region() {
    let mut event_loop = EventLoopBuilder::new()
        .critical_region(FreeRegion { queued: 0 })
        .build();
    event_loop
        .register(EventKind::WantCriticalRegion, want_region)
        .unwrap();
    let entered = counter(&mut event_loop, EventKind::EnteredCriticalRegion);

    event_loop.enqueue(EventKind::WantCriticalRegion, Cookie::empty());

    assert_eq!(event_loop.run_pending(), 2);
    assert_eq!(entered.get(), 1);
}
