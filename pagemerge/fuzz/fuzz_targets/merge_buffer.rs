#![no_main]

use libfuzzer_sys::fuzz_target;
use pagemerge::merge::{Merger, NeverCancel};
use pagemerge::plan::{MergePlan, PagePlanEntry, Rotation};
use pagemerge::protocol::TaskId;
use pagemerge::{Config, ErrorKind};
use std::sync::OnceLock;

static MERGER: OnceLock<Merger> = OnceLock::new();

fn merger() -> &'static Merger {
    MERGER.get_or_init(|| Merger::new(Config::default()))
}

fuzz_target!(|data: &[u8]| {
    // First page twice, second turned; out-of-range pages are plan errors.
    let entries = vec![
        PagePlanEntry::new(1, 2, Rotation::None),
        PagePlanEntry::new(1, 1, Rotation::Clockwise90),
        PagePlanEntry::new(2, 3, Rotation::Rotate180),
    ];
    let plan = MergePlan::new().with_file(data.to_vec(), entries);

    match merger().merge(TaskId::next(), plan, &NeverCancel) {
        Ok(merged) => assert_eq!(merged.page_count, 3),
        Err(e) => assert!(matches!(
            e.kind(),
            ErrorKind::DecodeFailure | ErrorKind::MalformedPlan | ErrorKind::SerializeFailure
        )),
    }
});
