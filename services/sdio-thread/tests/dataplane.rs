mod support;

use std::rc::Rc;

use sdio_thread::{
    BlockError, CancelToken, Dispatch, DispatchError, Dispatcher, DropReason, Handshake,
    RetryLimit, SdioConfig, ShmRegion,
    proto::{Magic, SysError, TaskId},
};
use support::*;

const BUF: usize = config::SDIO_BUF_SIZE;

fn pattern() -> Vec<u8> {
    (0..BUF).map(|i| (i % 251) as u8).collect()
}

#[test]
fn write_request_goes_to_storage_then_acks() {
    let trace = trace();
    let mut kernel = FakeKernel::new(&trace);
    kernel.push(PEER, command(Magic::DataWrDmaReq, 100, 2));
    let mut disk = FakeDisk::new(&trace);
    let mut mem = pattern();

    let mut dp = Dispatcher::new(
        &mut kernel,
        &mut disk,
        ShmRegion::new(&mut mem, 0),
        PEER,
        SdioConfig::legacy(),
    );
    assert_eq!(
        dp.poll(),
        Ok(Dispatch::Written {
            sector: 100,
            len: 1024
        })
    );
    drop(dp);

    assert_eq!(
        *trace.borrow(),
        vec![
            Event::Recv { from: PEER },
            Event::Write {
                sector: 100,
                len: 1024
            },
            Event::Send {
                to: PEER,
                bytes: ack(Magic::DataWrDmaAck),
            },
        ]
    );
    assert_eq!(disk.written, vec![(100, pattern()[..1024].to_vec())]);
}

#[test]
fn read_request_fills_the_buffer_then_acks() {
    let trace = trace();
    let mut kernel = FakeKernel::new(&trace);
    kernel.push(PEER, command(Magic::DataRdDmaReq, 8, 3));
    let mut disk = FakeDisk::new(&trace);
    let mut mem = vec![0u8; BUF];

    let mut dp = Dispatcher::new(
        &mut kernel,
        &mut disk,
        ShmRegion::new(&mut mem, 0),
        PEER,
        SdioConfig::legacy(),
    );
    assert_eq!(dp.poll(), Ok(Dispatch::Read { sector: 8, len: 1536 }));
    drop(dp);

    assert!(mem[..1536].iter().all(|b| *b == 0x5a));
    assert!(mem[1536..].iter().all(|b| *b == 0));
    assert_eq!(
        position(&trace, |e| *e == Event::Read { sector: 8, len: 1536 }),
        Some(1)
    );
    assert_eq!(sent(&trace), vec![ack(Magic::DataRdDmaAck)]);
}

#[test]
fn the_ack_message_is_reused_across_replies() {
    let trace = trace();
    let mut kernel = FakeKernel::new(&trace);
    kernel.push(PEER, command(Magic::DataRdDmaReq, 1, 1));
    kernel.push(PEER, command(Magic::DataWrDmaReq, 2, 1));
    kernel.push(PEER, command(Magic::DataRdDmaReq, 3, 1));
    let mut disk = FakeDisk::new(&trace);
    let mut mem = vec![0u8; BUF];

    let mut dp = Dispatcher::new(
        &mut kernel,
        &mut disk,
        ShmRegion::new(&mut mem, 0),
        PEER,
        SdioConfig::legacy(),
    );
    for _ in 0..3 {
        dp.poll().unwrap();
    }
    assert_eq!(
        sent(&trace),
        vec![
            ack(Magic::DataRdDmaAck),
            ack(Magic::DataWrDmaAck),
            ack(Magic::DataRdDmaAck),
        ]
    );
}

#[test]
fn invalid_commands_are_dropped_silently() {
    let cases = [
        (
            TaskId(9),
            command(Magic::DataWrDmaReq, 0, 1),
            DropReason::ForeignSender(TaskId(9)),
        ),
        (
            PEER,
            command(Magic::DataWrDmaAck, 0, 1),
            DropReason::UnknownMagic(0x11),
        ),
        (
            PEER,
            command(Magic::TaskStateCmd, 0, 1),
            DropReason::UnknownMagic(0x01),
        ),
        (
            PEER,
            command(Magic::Unknown(0x7f), 0, 1),
            DropReason::UnknownMagic(0x7f),
        ),
        (PEER, vec![0x10, 0, 0, 0, 1], DropReason::Truncated(5)),
        (
            PEER,
            command(Magic::DataRdDmaReq, 0, 17),
            DropReason::Oversized {
                num_sectors: 17,
                capacity: BUF,
            },
        ),
        (
            PEER,
            command(Magic::DataWrDmaReq, 0, u32::MAX),
            DropReason::Oversized {
                num_sectors: u32::MAX,
                capacity: BUF,
            },
        ),
    ];

    for (sender, bytes, reason) in cases {
        let trace = trace();
        let mut kernel = FakeKernel::new(&trace);
        kernel.push(sender, bytes);
        let mut disk = FakeDisk::new(&trace);
        let mut mem = vec![0u8; BUF];

        let mut dp = Dispatcher::new(
            &mut kernel,
            &mut disk,
            ShmRegion::new(&mut mem, 0),
            PEER,
            SdioConfig::legacy(),
        );
        assert_eq!(dp.poll(), Ok(Dispatch::Dropped(reason)));
        drop(dp);
        assert_eq!(*trace.borrow(), vec![Event::Recv { from: PEER }]);
        assert_eq!(kernel.send_attempts, 0);
    }
}

#[test]
fn receive_failure_is_dropped() {
    let trace = trace();
    let mut kernel = FakeKernel::new(&trace);
    kernel.inbox.push_back(Err(SysError::Inval));
    let mut disk = FakeDisk::new(&trace);
    let mut mem = vec![0u8; BUF];

    let mut dp = Dispatcher::new(
        &mut kernel,
        &mut disk,
        ShmRegion::new(&mut mem, 0),
        PEER,
        SdioConfig::legacy(),
    );
    assert_eq!(
        dp.poll(),
        Ok(Dispatch::Dropped(DropReason::Recv(SysError::Inval)))
    );
    drop(dp);
    assert!(sent(&trace).is_empty());
}

#[test]
fn a_full_buffer_request_is_accepted() {
    let trace = trace();
    let mut kernel = FakeKernel::new(&trace);
    kernel.push(PEER, command(Magic::DataWrDmaReq, 0, 16));
    let mut disk = FakeDisk::new(&trace);
    let mut mem = vec![1u8; BUF];

    let mut dp = Dispatcher::new(
        &mut kernel,
        &mut disk,
        ShmRegion::new(&mut mem, 0),
        PEER,
        SdioConfig::legacy(),
    );
    assert_eq!(dp.poll(), Ok(Dispatch::Written { sector: 0, len: BUF }));
}

#[test]
fn loop_exits_when_cancelled() {
    let trace = trace();
    let token = Rc::new(CancelToken::new());
    let mut kernel = FakeKernel::new(&trace);
    kernel.push(PEER, command(Magic::DataWrDmaReq, 4, 1));
    kernel.push(PEER, command(Magic::DataRdDmaReq, 4, 1));
    kernel.cancel_on_empty = Some(token.clone());
    let mut disk = FakeDisk::new(&trace);
    let mut mem = vec![0u8; BUF];

    let mut dp = Dispatcher::new(
        &mut kernel,
        &mut disk,
        ShmRegion::new(&mut mem, 0),
        PEER,
        SdioConfig::legacy(),
    );
    assert_eq!(dp.run(&token), Ok(()));
    assert!(token.is_cancelled());
    assert_eq!(
        sent(&trace),
        vec![ack(Magic::DataWrDmaAck), ack(Magic::DataRdDmaAck)]
    );
    assert_eq!(count(&trace, |e| matches!(e, Event::Recv { .. })), 3);
}

#[test]
fn cancelled_token_stops_before_receiving() {
    let trace = trace();
    let token = CancelToken::new();
    token.cancel();
    let mut kernel = FakeKernel::new(&trace);
    let mut disk = FakeDisk::new(&trace);
    let mut mem = vec![0u8; BUF];

    let mut dp = Dispatcher::new(
        &mut kernel,
        &mut disk,
        ShmRegion::new(&mut mem, 0),
        PEER,
        SdioConfig::hardened(),
    );
    assert_eq!(dp.run(&token), Ok(()));
    assert!(trace.borrow().is_empty());
}

#[test]
fn legacy_acks_even_when_storage_fails() {
    let trace = trace();
    let mut kernel = FakeKernel::new(&trace);
    kernel.push(PEER, command(Magic::DataWrDmaReq, 4, 1));
    let mut disk = FakeDisk::new(&trace);
    disk.io_result = Err(BlockError::Io);
    let mut mem = vec![0u8; BUF];

    let mut dp = Dispatcher::new(
        &mut kernel,
        &mut disk,
        ShmRegion::new(&mut mem, 0),
        PEER,
        SdioConfig::legacy(),
    );
    assert!(dp.poll().is_ok());
    drop(dp);
    assert_eq!(sent(&trace), vec![ack(Magic::DataWrDmaAck)]);
}

#[test]
fn hardened_stops_without_ack_when_storage_fails() {
    let trace = trace();
    let token = CancelToken::new();
    let mut kernel = FakeKernel::new(&trace);
    kernel.push(PEER, command(Magic::DataRdDmaReq, 4, 1));
    let mut disk = FakeDisk::new(&trace);
    disk.io_result = Err(BlockError::Io);
    let mut mem = vec![0u8; BUF];

    let mut dp = Dispatcher::new(
        &mut kernel,
        &mut disk,
        ShmRegion::new(&mut mem, 0),
        PEER,
        SdioConfig::hardened(),
    );
    assert_eq!(dp.run(&token), Err(DispatchError::Storage(BlockError::Io)));
    drop(dp);
    assert_eq!(kernel.send_attempts, 0);
}

#[test]
fn strict_loop_ends_on_rejected_command() {
    let trace = trace();
    let token = CancelToken::new();
    let mut kernel = FakeKernel::new(&trace);
    kernel.push(TaskId(3), command(Magic::DataWrDmaReq, 0, 1));
    let mut disk = FakeDisk::new(&trace);
    let mut mem = vec![0u8; BUF];

    let mut dp = Dispatcher::new(
        &mut kernel,
        &mut disk,
        ShmRegion::new(&mut mem, 0),
        PEER,
        SdioConfig::hardened(),
    );
    assert_eq!(
        dp.run(&token),
        Err(DispatchError::Rejected(DropReason::ForeignSender(TaskId(3))))
    );
}

#[test]
fn busy_acks_follow_the_retry_limit() {
    // 遗留行为只发送一次
    let trace = trace();
    let mut kernel = FakeKernel::new(&trace);
    kernel.push(PEER, command(Magic::DataWrDmaReq, 0, 1));
    kernel.busy_sends = 2;
    let mut disk = FakeDisk::new(&trace);
    let mut mem = vec![0u8; BUF];
    let mut dp = Dispatcher::new(
        &mut kernel,
        &mut disk,
        ShmRegion::new(&mut mem, 0),
        PEER,
        SdioConfig::legacy(),
    );
    assert_eq!(dp.poll(), Err(DispatchError::Send(SysError::Busy)));
    drop(dp);
    assert_eq!(kernel.send_attempts, 1);

    let trace = support::trace();
    let mut kernel = FakeKernel::new(&trace);
    kernel.push(PEER, command(Magic::DataWrDmaReq, 0, 1));
    kernel.busy_sends = 2;
    let mut disk = FakeDisk::new(&trace);
    let mut mem = vec![0u8; BUF];
    let config = SdioConfig {
        ack_retry: RetryLimit::Attempts(2),
        ..SdioConfig::legacy()
    };
    let mut dp = Dispatcher::new(
        &mut kernel,
        &mut disk,
        ShmRegion::new(&mut mem, 0),
        PEER,
        config,
    );
    assert!(dp.poll().is_ok());
    drop(dp);
    assert_eq!(kernel.send_attempts, 3);
    assert_eq!(sent(&trace), vec![ack(Magic::DataWrDmaAck)]);
}

#[test]
fn handshake_then_write_request() {
    let trace = trace();
    let mut kernel = FakeKernel::new(&trace).with_peer_handshake();
    kernel.push(PEER, command(Magic::DataWrDmaReq, 100, 2));
    let mut disk = FakeDisk::new(&trace);
    let mut mem = pattern();
    let shm = ShmRegion::new(&mut mem, 0x4020_0000);

    let config = SdioConfig::legacy();
    let session = Handshake::new(&mut kernel, &mut disk, config, SELF)
        .run(&shm)
        .unwrap();
    assert_eq!(session.peer, TaskId(7));
    let handshake_len = trace.borrow().len();

    let mut dp = Dispatcher::new(&mut kernel, &mut disk, shm, session.peer, config);
    dp.poll().unwrap();
    drop(dp);

    assert_eq!(
        trace.borrow()[handshake_len..],
        [
            Event::Recv { from: PEER },
            Event::Write {
                sector: 100,
                len: 1024
            },
            Event::Send {
                to: PEER,
                bytes: ack(Magic::DataWrDmaAck),
            },
        ]
    );
    assert_eq!(count(&trace, |e| matches!(e, Event::Write { .. })), 1);
}

#[test]
fn written_sectors_can_be_read_back() {
    use sdio_thread::{BlockDevice, RamDisk};

    let trace = trace();
    let mut kernel = FakeKernel::new(&trace);
    kernel.push(PEER, command(Magic::DataWrDmaReq, 3, 2));
    kernel.push(PEER, command(Magic::DataRdDmaReq, 4, 1));
    let mut disk_mem = vec![0u8; 16 * 512];
    let mut disk = RamDisk::new(&mut disk_mem);
    disk.init().unwrap();
    let mut mem = pattern();

    let mut dp = Dispatcher::new(
        &mut kernel,
        &mut disk,
        ShmRegion::new(&mut mem, 0),
        PEER,
        SdioConfig::hardened(),
    );
    dp.poll().unwrap();
    dp.poll().unwrap();
    drop(dp);

    // 第 4 扇区是刚才写入的第二个扇区
    let expected = pattern();
    assert_eq!(mem[..512], expected[512..1024]);
    assert_eq!(disk.as_bytes()[3 * 512..5 * 512], expected[..1024]);
    assert_eq!(
        sent(&trace),
        vec![ack(Magic::DataWrDmaAck), ack(Magic::DataRdDmaAck)]
    );
}
