use renal_workers::protocol::run_main;
use renal_workers::workers::ClassifyWorker;

fn main() {
    run_main(ClassifyWorker::from_os_rng());
}
