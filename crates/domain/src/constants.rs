//! Domain constants
//!
//! Activity, sub-activity and field labels are the human labels operators
//! capture; they are matched verbatim.

// Activities
pub const ACTIVITY_HAULING: &str = "Hauling";
pub const ACTIVITY_DEVELOPMENT: &str = "Development";
pub const ACTIVITY_LOADING: &str = "Loading";

// Sub-activities
pub const SUB_PRODUCTION: &str = "Production";
pub const SUB_DEVELOPMENT: &str = "Development";
pub const SUB_FACE_DRILLING: &str = "Face Drilling";
pub const SUB_GROUND_SUPPORT: &str = "Ground Support";
pub const SUB_REHAB: &str = "Rehab";

// Raw payload fields
pub const FIELD_WEIGHT: &str = "Weight";
pub const FIELD_DISTANCE: &str = "Distance";
pub const FIELD_TRUCKS: &str = "Trucks";
pub const FIELD_NO_OF_HOLES: &str = "No of Holes";
pub const FIELD_CUT_LENGTH: &str = "Cut Length";
pub const FIELD_NO_OF_BOLTS: &str = "No. of Bolts";
pub const FIELD_BOLT_LENGTH: &str = "Bolt Length";
pub const FIELD_EQUIPMENT: &str = "Equipment";
pub const FIELD_BUCKETS: &str = "Buckets";
pub const FIELD_MATERIAL: &str = "Material";

// Derived metrics
pub const METRIC_DEV_DRILLM: &str = "Dev Drillm";
pub const METRIC_GS_DRILLM: &str = "GS Drillm";
pub const METRIC_TKMS: &str = "TKMs";

/// Material value counted by the factor solver.
pub const MATERIAL_ORE: &str = "ore";

// Solver defaults
pub const DEFAULT_REGULARIZATION: f64 = 0.05;
pub const DEFAULT_MAX_ITERATIONS: usize = 600;
pub const DEFAULT_SOLVER_TOLERANCE: f64 = 1e-6;

/// Decimal places for the per-day `spread_daily` allocation.
pub const ALLOCATION_ROUNDING_DP: u32 = 4;

/// Number of independent constraints the reconciliation targets provide.
pub const SOLVER_CONSTRAINTS: usize = 2;

/// Decimal places kept when a shift's floating-point metric enters a
/// monthly actual total.
pub const ACTUAL_TOTAL_DP: u32 = 6;
