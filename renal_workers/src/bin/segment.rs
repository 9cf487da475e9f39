use renal_workers::protocol::run_main;
use renal_workers::workers::SegmentWorker;

fn main() {
    run_main(SegmentWorker::<renal_vision::CentralRegion>::default());
}
