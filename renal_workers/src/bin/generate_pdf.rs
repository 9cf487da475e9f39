use renal_workers::protocol::run_main;
use renal_workers::workers::GeneratePdfWorker;

fn main() {
    run_main(GeneratePdfWorker::default());
}
