//! The exit sweep clears the whole process-wide context, so it gets a test
//! binary of its own.

mod common;

use std::thread;

use callback_core::global;
use common::DropCounter;

#[test]
fn test_exit_sweep_releases_leftover_handlers() {
    let drops = DropCounter::new();
    {
        let _sweep = global::install_exit_sweep();
        global::set_default("sweep-direct", drops.handler(1));
        global::set_default_async("sweep-async", drops.handler(2));
        global::push_async("sweep-async", drops.handler(3));

        // A thread that is still parked when the sweep runs.
        let parked = drops.clone();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();
        let worker = thread::spawn(move || {
            global::push("sweep-direct", parked.handler(4));
            ready_tx.send(()).unwrap();
            let _ = done_rx.recv();
            global::context().depth("sweep-direct")
        });
        ready_rx.recv().unwrap();

        drop(_sweep);
        assert_eq!(drops.get(), 4);

        done_tx.send(()).unwrap();
        assert_eq!(worker.join().unwrap(), 0);
    }
    assert_eq!(drops.get(), 4);
    assert_eq!(global::context().stats().live_thread_tables, 0);
}
