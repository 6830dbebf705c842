//! Configuration types deserialized from `techlib.toml`.

use std::collections::BTreeMap;

use serde::Deserialize;
use techlib_model::DeviceKind;

/// The top-level characterization configuration parsed from `techlib.toml`.
///
/// Every section is optional; an empty file yields the defaults used by the
/// standard characterization flow.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TechConfig {
    /// Run-level settings (clock constraint, worker count, output paths).
    #[serde(default)]
    pub run: RunConfig,
    /// The target device and its fixed parameters.
    #[serde(default)]
    pub device: DeviceConfig,
    /// The synthesis backend used for characterization.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Template enumeration settings.
    #[serde(default)]
    pub specialization: SpecializationConfig,
    /// Constants used by the post-measurement corrections.
    #[serde(default)]
    pub correction: CorrectionConfig,
}

/// Run-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Clock period constraint handed to the synthesis tool, in nanoseconds.
    #[serde(default = "default_clock_period")]
    pub clock_period_ns: f64,
    /// Number of synthesis jobs allowed to run concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Directory under which per-cell work directories are created.
    #[serde(default = "default_work_dir")]
    pub work_dir: String,
    /// Path of the characterization output document.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            clock_period_ns: default_clock_period(),
            workers: default_workers(),
            work_dir: default_work_dir(),
            output: default_output(),
        }
    }
}

/// The target device description.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Device part name, recorded in the output document.
    #[serde(default)]
    pub name: String,
    /// Vendor name (e.g. "xilinx"), recorded in the output document.
    #[serde(default)]
    pub vendor: Option<String>,
    /// Whether the target is an FPGA or an ASIC standard-cell library.
    #[serde(default)]
    pub kind: DeviceKind,
    /// Largest BRAM port width the device supports.
    #[serde(default = "default_bram_bitsize_max")]
    pub bram_bitsize_max: u32,
    /// DSP block x-operand widths, paired positionally with `dsp_y_sizes`.
    #[serde(default)]
    pub dsp_x_sizes: Vec<u32>,
    /// DSP block y-operand widths, paired positionally with `dsp_x_sizes`.
    #[serde(default)]
    pub dsp_y_sizes: Vec<u32>,
    /// Maximum LUT input count; inputs of `lut_expr_FU` beyond it are tied low.
    #[serde(default)]
    pub max_lut_size: Option<usize>,
    /// Additional free-form device parameters copied to the output document.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            vendor: None,
            kind: DeviceKind::default(),
            bram_bitsize_max: default_bram_bitsize_max(),
            dsp_x_sizes: Vec::new(),
            dsp_y_sizes: Vec::new(),
            max_lut_size: None,
            parameters: BTreeMap::new(),
        }
    }
}

impl DeviceConfig {
    /// Maps each DSP y-width to its paired x-width.
    pub fn dsp_y_to_x(&self) -> BTreeMap<u32, u32> {
        self.dsp_y_sizes
            .iter()
            .copied()
            .zip(self.dsp_x_sizes.iter().copied())
            .collect()
    }
}

/// The report dialect spoken by the configured synthesis tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendDialect {
    /// Synopsys Design Compiler area/timing reports (ASIC).
    DesignCompiler,
    /// Xilinx ISE map/trace reports.
    XilinxMap,
    /// Xilinx Vivado key/value utilization report.
    #[default]
    Vivado,
}

/// External synthesis tool settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Which report dialect to parse.
    #[serde(default)]
    pub dialect: BackendDialect,
    /// Program to execute for one characterization run.
    #[serde(default)]
    pub command: String,
    /// Arguments passed to the program. `{top}`, `{files}`, `{clock}` and
    /// `{constraints}` are substituted per run.
    #[serde(default)]
    pub args: Vec<String>,
    /// Wall-clock limit for one synthesis run, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Optional raw constraint-file text written next to the netlist.
    #[serde(default)]
    pub constraints: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            dialect: BackendDialect::default(),
            command: String::new(),
            args: Vec::new(),
            timeout_secs: default_timeout(),
            constraints: None,
        }
    }
}

/// Template enumeration settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SpecializationConfig {
    /// Widths enumerated for a template type that declares no precisions.
    #[serde(default = "default_template_widths")]
    pub template_widths: Vec<u32>,
    /// Widths enumerated for a concrete unit type that declares no precisions.
    #[serde(default = "default_concrete_widths")]
    pub concrete_widths: Vec<u32>,
    /// Bit pattern driven on the pinned input port.
    #[serde(default = "default_characterizing_constant")]
    pub characterizing_constant: String,
    /// Number of elements a port vector receives when no portsize is given.
    #[serde(default = "default_port_vector_size")]
    pub port_vector_size: u32,
    /// Units never characterized (primitive gates, constants, glue cells).
    #[serde(default = "default_skip_units")]
    pub skip_units: Vec<String>,
}

impl Default for SpecializationConfig {
    fn default() -> Self {
        Self {
            template_widths: default_template_widths(),
            concrete_widths: default_concrete_widths(),
            characterizing_constant: default_characterizing_constant(),
            port_vector_size: default_port_vector_size(),
            skip_units: default_skip_units(),
        }
    }
}

/// Constants used by the post-measurement corrections.
#[derive(Debug, Clone, Deserialize)]
pub struct CorrectionConfig {
    /// Cell whose operation time is the assignment baseline.
    #[serde(default = "default_baseline_cell")]
    pub baseline_cell: String,
    /// Operation of `baseline_cell` providing the baseline time.
    #[serde(default = "default_baseline_operation")]
    pub baseline_operation: String,
    /// Fixed baseline time in nanoseconds, overriding the measured one.
    #[serde(default)]
    pub baseline_time_ns: Option<f64>,
    /// Ratio of the baseline time charged as connection delay.
    #[serde(default = "default_connection_offset")]
    pub relative_connection_offset: f64,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            baseline_cell: default_baseline_cell(),
            baseline_operation: default_baseline_operation(),
            baseline_time_ns: None,
            relative_connection_offset: default_connection_offset(),
        }
    }
}

fn default_clock_period() -> f64 {
    10.0
}

fn default_workers() -> usize {
    1
}

fn default_work_dir() -> String {
    "characterization".to_string()
}

fn default_output() -> String {
    "characterization.json".to_string()
}

fn default_bram_bitsize_max() -> u32 {
    64
}

fn default_timeout() -> u64 {
    3600
}

fn default_template_widths() -> Vec<u32> {
    vec![1, 8, 16, 32, 64]
}

fn default_concrete_widths() -> Vec<u32> {
    vec![32]
}

fn default_characterizing_constant() -> String {
    // 0x5555555555555555
    "6148914691236517205".to_string()
}

fn default_port_vector_size() -> u32 {
    2
}

fn default_skip_units() -> Vec<String> {
    [
        "LUT",
        "AND_GATE",
        "NAND_GATE",
        "OR_GATE",
        "NOR_GATE",
        "XOR_GATE",
        "XNOR_GATE",
        "split_signal",
        "FSL_handler",
        "extract_bit_expr_FU",
        "constant_value",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_baseline_cell() -> String {
    "ASSIGN_VECTOR_BOOL_FU".to_string()
}

fn default_baseline_operation() -> String {
    "ASSIGN".to_string()
}

fn default_connection_offset() -> f64 {
    0.15
}
