#[macro_use]
extern crate costas_rs;

use costas_rs::constellation::PskConstellation;
use costas_rs::io::raw_iq::SymbolOutput;
use costas_rs::prelude::*;
use costas_rs::receiver::receiver_node::ConstellationReceiverNode;
use costas_rs::receiver::{ConstellationReceiver, LoopConfig};
use costas_rs::util::signal_source::OffsetSymbolSource;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use std::fs::File;
use std::io::BufWriter;

/// An example that generates noisy QPSK carrying a carrier offset, recovers
/// the carrier with a constellation receiver and writes the decided symbols
/// to a file. Loop convergence is logged per batch, and the loop bandwidth
/// is narrowed once the loop has pulled in.
fn main() {
    SimpleLogger::new().with_level(LevelFilter::Info).init().unwrap();

    let qpsk = PskConstellation::qpsk();
    let mut source = OffsetSymbolSource::new(qpsk.clone(), 0.04, 1.0, 1024, 7)
        .unwrap()
        .with_noise(0.05)
        .unwrap()
        .with_batch_limit(40);

    let config = LoopConfig {
        loop_bw: 0.05,
        fmin: -0.5,
        fmax: 0.5,
        ..Default::default()
    };
    let rx = ConstellationReceiver::from_config(qpsk, &config).unwrap();
    let mut receiver = ConstellationReceiverNode::new(rx);
    let handle = receiver.handle();
    let (diag_send, diag_recv) = channel::unbounded();
    receiver.diagnostics.push(diag_send);

    let writer = BufWriter::new(File::create("./qpsk_symbols.bin").unwrap());
    let mut output = SymbolOutput::new(writer);

    connect_nodes!(source, sender, receiver, input);
    connect_nodes!(receiver, sender, output, input);
    let handles = start_nodes!(source, receiver, output);

    for (batch, diag) in diag_recv.iter().enumerate() {
        let mean_err = diag.error.iter().map(|e| e.abs()).sum::<f64>() / diag.error.len() as f64;
        info!(
            "batch {}: mean |error| {:.4}, frequency {:.5}",
            batch,
            mean_err,
            diag.frequency.last().copied().unwrap_or(0.0)
        );
        if batch == 10 {
            handle.set_loop_bandwidth(0.01).unwrap();
            info!("narrowed loop: alpha {:.5}, beta {:.6}", handle.alpha(), handle.beta());
        }
    }

    for h in handles {
        info!("node stopped: {}", h.join().unwrap());
    }
    println!("final loop state: {:?}", handle.snapshot());
}
