#![no_main]

use libfuzzer_sys::fuzz_target;
use pagemerge::manifest::PlanManifest;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };

    // Anything that parses must survive a round trip unchanged.
    if let Ok(manifest) = PlanManifest::from_json(json) {
        let again = PlanManifest::from_json(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(manifest, again);
    }
});
