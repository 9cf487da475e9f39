use renal_workers::protocol::run_main;
use renal_workers::workers::ProcessMatWorker;

fn main() {
    run_main(ProcessMatWorker::from_os_rng());
}
