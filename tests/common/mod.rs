//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use argmap_rs::Nodeset;

pub const L1_TEXT: &str = "Alice : taxes are too high";
pub const L2_TEXT: &str = "Bob : we should cut spending";
pub const L3_TEXT: &str = "Carol : schools need money";

/// Three turns `L1 → TA4 → L2 → TA5 → L3`, each asserting one proposition
/// (`I11`, `I12`, `I13`), and an inference `I11 → RA20 → I12` anchored in TA4.
///
/// With `ta4_reversed` the first transition is stored as `L2 → TA4 → L1`
/// while the inference keeps its orientation.
pub fn debate(ta4_reversed: bool) -> Nodeset {
    let (first, second) = if ta4_reversed { (2, 1) } else { (1, 2) };
    Nodeset::new()
        .with_node(1, "L", L1_TEXT)
        .with_node(2, "L", L2_TEXT)
        .with_node(3, "L", L3_TEXT)
        .with_node(4, "TA", "Default Transition")
        .with_node(5, "TA", "Default Transition")
        .with_node(11, "I", "taxes are too high")
        .with_node(12, "I", "we should cut spending")
        .with_node(13, "I", "schools need money")
        .with_node(20, "RA", "Default Inference")
        .with_node(31, "YA", "Asserting")
        .with_node(32, "YA", "Asserting")
        .with_node(33, "YA", "Asserting")
        .with_node(34, "YA", "Arguing")
        .with_relation(&[first], 4, &[second])
        .with_relation(&[2], 5, &[3])
        .with_relation(&[11], 20, &[12])
        .with_relation(&[1], 31, &[11])
        .with_relation(&[2], 32, &[12])
        .with_relation(&[3], 33, &[13])
        .with_relation(&[4], 34, &[20])
}

/// [`debate`] where `I13` is a second premise of RA20. TA4 supports the
/// inference, TA5 (`L2 → L3`) contradicts it.
pub fn contradictory_debate() -> Nodeset {
    debate(false).with_edge(13, 20)
}

/// Log to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
