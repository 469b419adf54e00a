use dme_events::{Context, Cookie, EventKind, EventLoopBuilder, RunState};
use std::cell::Cell;
use std::net::UdpSocket;
use std::rc::Rc;

#[test]
fn test_operator_interrupt_runs_end_of_run() {
    let mut event_loop = EventLoopBuilder::new().handle_interrupts(true).build();
    let teardowns = Rc::new(Cell::new(0));
    let teardowns_clone = teardowns.clone();

    event_loop
        .register(EventKind::EndOfRun, move |_ctx: &mut Context, _cookie: Cookie| {
            teardowns_clone.set(teardowns_clone.get() + 1);
            Ok(())
        })
        .unwrap();
    event_loop
        .init(UdpSocket::bind("127.0.0.1:0").expect("bind"))
        .expect("init");

    let res = unsafe { libc::raise(libc::SIGINT) };
    assert_eq!(res, 0);

    assert_eq!(event_loop.run(), Ok(()));
    assert_eq!(teardowns.get(), 1);
    assert_eq!(event_loop.state(), RunState::Stopped);
}
