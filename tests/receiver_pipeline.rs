#[macro_use]
extern crate costas_rs;

use assert_approx_eq::assert_approx_eq;
use byteorder::{NativeEndian, WriteBytesExt};
use costas_rs::constellation::{Constellation, PskConstellation};
use costas_rs::io::raw_iq::{IqBatchInput, SymbolOutput};
use costas_rs::prelude::*;
use costas_rs::receiver::receiver_node::ConstellationReceiverNode;
use costas_rs::receiver::{ConstellationReceiver, LoopConfig};
use costas_rs::util::signal_source::OffsetSymbolSource;
use std::io::Cursor;

#[test]
fn threaded_pipeline_locks() {
    let qpsk = PskConstellation::qpsk();
    let mut source = OffsetSymbolSource::new(qpsk.clone(), 0.05, 0.2, 250, 1)
        .unwrap()
        .with_batch_limit(4);
    let rx = ConstellationReceiver::new(qpsk, 0.05, -0.5, 0.5).unwrap();
    let mut receiver = ConstellationReceiverNode::new(rx);
    let handle = receiver.handle();

    let (sym_send, sym_recv) = channel::unbounded();
    receiver.sender.push(sym_send);
    let (diag_send, diag_recv) = channel::unbounded();
    receiver.diagnostics.push(diag_send);
    connect_nodes!(source, sender, receiver, input);

    let handles = start_nodes!(source, receiver);
    let reasons: Vec<NodeError> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(reasons, vec![NodeError::DataEnd, NodeError::CommError]);

    let batches: Vec<Vec<u32>> = sym_recv.try_iter().collect();
    assert_eq!(batches.len(), 4);
    assert!(batches.iter().all(|b| b.len() == 250));

    let diags: Vec<_> = diag_recv.try_iter().collect();
    assert_eq!(diags.len(), 4);
    let last = &diags[3];
    assert_approx_eq!(last.frequency[249], 0.05, 1e-3);
    for e in &last.error[150..] {
        assert!(e.abs() < 0.05, "phase error {} after lock", e);
    }
    assert_eq!(handle.frequency(), last.frequency[249]);
    assert_eq!(handle.phase(), last.phase[249]);
}

#[test]
fn retune_between_batches() {
    let qpsk = PskConstellation::qpsk();
    let mut source = OffsetSymbolSource::new(qpsk.clone(), 0.03, -0.4, 500, 9).unwrap();
    let config = LoopConfig {
        loop_bw: 0.02,
        fmin: -0.5,
        fmax: 0.5,
        ..Default::default()
    };
    let rx = ConstellationReceiver::from_config(qpsk, &config).unwrap();
    let mut receiver = ConstellationReceiverNode::new(rx);
    let handle = receiver.handle();

    let (send, recv) = channel::unbounded();
    source.sender.push(send);
    receiver.input = Some(recv);
    let (sym_send, sym_recv) = channel::unbounded();
    receiver.sender.push(sym_send);

    source.call().unwrap();
    receiver.call().unwrap();
    let alpha = handle.alpha();
    handle.set_loop_bandwidth(0.08).unwrap();
    assert!(handle.alpha() > alpha);
    assert!(handle.set_damping_factor(2.0).is_err());

    for _ in 0..3 {
        source.call().unwrap();
        receiver.call().unwrap();
    }
    assert_eq!(sym_recv.try_iter().count(), 4);
    assert_approx_eq!(handle.frequency(), 0.03, 1e-3);
}

#[test]
fn raw_iq_recording_to_symbols() {
    let qpsk = PskConstellation::qpsk();
    let mut source = OffsetSymbolSource::new(qpsk.clone(), 0.0, 0.0, 100, 4).unwrap();
    let (samples, sent) = source.next_batch();

    let mut bytes = vec![];
    for s in &samples {
        bytes.write_i16::<NativeEndian>((s.re * 16384.0).round() as i16).unwrap();
        bytes.write_i16::<NativeEndian>((s.im * 16384.0).round() as i16).unwrap();
    }

    let mut input = IqBatchInput::new(Cursor::new(bytes), 32);
    let rx = ConstellationReceiver::new(qpsk.clone(), 0.05, -0.5, 0.5).unwrap();
    let mut receiver = ConstellationReceiverNode::new(rx);
    let mut output = SymbolOutput::new(Vec::new());

    let (send, recv) = channel::unbounded();
    input.sender.push(send);
    receiver.input = Some(recv);
    let (send, recv) = channel::unbounded();
    receiver.sender.push(send);
    output.input = Some(recv);

    loop {
        match input.call() {
            Ok(()) => {
                receiver.call().unwrap();
                output.call().unwrap();
            }
            Err(e) => {
                assert_eq!(e, NodeError::DataEnd);
                break;
            }
        }
    }

    let written: Vec<u32> = output.into_inner().into_iter().map(u32::from).collect();
    assert_eq!(written.len(), 100);
    assert_eq!(written, sent);
    assert!(written.iter().all(|s| (*s as usize) < qpsk.arity()));
}
