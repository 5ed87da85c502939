//! Single configuration record enumerating which cumulative / 2-D enhancements are enabled.
//!
//! Mirrors the teacher's convention of tuning solver constants through [env_param]: the
//! numeric thresholds below can be overridden at process start through environment variables,
//! while the boolean switches default to the values that give the most complete propagation.

use env_param::EnvParam;

static MAX_PAIRS_PAIRWISE: EnvParam<usize> =
    EnvParam::new("ARIES_NO_OVERLAP_2D_MAX_PAIRS_PAIRWISE", "1024");
static MAX_INTERVALS_TIMETABLE_EDGE_FINDING: EnvParam<usize> =
    EnvParam::new("ARIES_CUMULATIVE_MAX_INTERVALS_TIMETABLE_EDGE_FINDING", "64");
static MAX_SIZE_PRECEDENCE_LITERALS: EnvParam<usize> =
    EnvParam::new("ARIES_DISJUNCTIVE_MAX_SIZE_PRECEDENCE_LITERALS", "16");

/// Configuration of the optional reasoning layers of the scheduling core (spec §9.3).
#[derive(Clone, Debug)]
pub struct SchedulingConfig {
    pub use_disjunctive_in_cumulative: bool,
    pub use_overload_checker: bool,
    pub use_timetable_edge_finding: bool,
    pub use_conservative_scale_overload_checker: bool,
    pub use_precedences_in_disjunctive: bool,
    pub use_combined_no_overlap: bool,
    pub use_timetabling_in_no_overlap_2d: bool,
    pub use_energetic_reasoning_in_no_overlap_2d: bool,
    pub use_area_energetic_reasoning_in_no_overlap_2d: bool,
    pub use_try_edge_reasoning_in_no_overlap_2d: bool,
    pub max_pairs_pairwise_reasoning_in_no_overlap_2d: usize,
    pub max_num_intervals_for_timetable_edge_finding: usize,
    pub max_size_to_create_precedence_literals_in_disjunctive: usize,
    pub opp: OppConfig,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        SchedulingConfig {
            use_disjunctive_in_cumulative: true,
            use_overload_checker: true,
            use_timetable_edge_finding: true,
            use_conservative_scale_overload_checker: true,
            use_precedences_in_disjunctive: true,
            use_combined_no_overlap: true,
            use_timetabling_in_no_overlap_2d: true,
            use_energetic_reasoning_in_no_overlap_2d: true,
            use_area_energetic_reasoning_in_no_overlap_2d: false,
            use_try_edge_reasoning_in_no_overlap_2d: true,
            max_pairs_pairwise_reasoning_in_no_overlap_2d: MAX_PAIRS_PAIRWISE.get(),
            max_num_intervals_for_timetable_edge_finding: MAX_INTERVALS_TIMETABLE_EDGE_FINDING.get(),
            max_size_to_create_precedence_literals_in_disjunctive: MAX_SIZE_PRECEDENCE_LITERALS.get(),
            opp: OppConfig::default(),
        }
    }
}

/// Configuration of the orthogonal-packing infeasibility detector (spec §4.13).
#[derive(Clone, Debug)]
pub struct OppConfig {
    pub use_pairwise: bool,
    pub use_dff_f0: bool,
    /// The `K` values tried for the `f0(u, C) = ceil(u*K/C)` family.
    pub dff0_ks: Vec<i64>,
    pub use_dff_f2: bool,
    pub dff2_max_number_of_parameters_to_check: usize,
    pub brute_force_threshold: usize,
}

impl Default for OppConfig {
    fn default() -> Self {
        OppConfig {
            use_pairwise: true,
            use_dff_f0: true,
            dff0_ks: vec![2, 3, 4, 5, 8],
            use_dff_f2: true,
            dff2_max_number_of_parameters_to_check: 8,
            brute_force_threshold: 8,
        }
    }
}
