//! Device bus constants and memory initialization files.

use rand::Rng;
use techlib_backend::AuxiliaryFile;
use techlib_model::FunctionalUnit;

/// Memory type whose allocation is divided by 16.
pub const ASYNCHRONOUS: &str = "ASYNCHRONOUS";
/// Unaligned synchronous memory, possibly split over two init files.
pub const SYNCHRONOUS_UNALIGNED: &str = "SYNCHRONOUS_UNALIGNED";
/// Synchronous single-data-size memory.
pub const SYNCHRONOUS_SDS: &str = "SYNCHRONOUS_SDS";
/// Synchronous single-data-size memory on a bus.
pub const SYNCHRONOUS_SDS_BUS: &str = "SYNCHRONOUS_SDS_BUS";

const CHANNELS_11: &str = "MEM_ACC_11";
const CHANNELS_N1: &str = "MEM_ACC_N1";
const CHANNELS_NN: &str = "MEM_ACC_NN";

/// Base name of the memory init file.
pub const INIT_FILE: &str = "array_ref_0.mem";

/// Fixed bus and memory sizes used to instantiate a unit for measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConstants {
    /// BRAM port width: 16 bits, capped by the device.
    pub bram_bitsize: u32,
    /// Aligned access width.
    pub aligned_bitsize: u32,
    /// Bus data width.
    pub bus_data: u32,
    /// Bus address width.
    pub bus_addr: u32,
    /// Bus size-field width.
    pub bus_size: u32,
    /// Bus tag width.
    pub bus_tag: u32,
    /// Bytes of memory allocated to a memory unit.
    pub bytes_allocated: u32,
    /// Replicas of every port vector.
    pub port_vector_ports: u32,
}

impl DeviceConstants {
    /// Constants for `unit` on a device whose BRAM ports are at most
    /// `bram_bitsize_max` bits wide.
    pub fn for_unit(unit: &FunctionalUnit, bram_bitsize_max: u32, port_vector_ports: u32) -> Self {
        let bram_bitsize = 16.min(bram_bitsize_max);
        let mut bytes_allocated = 1024;
        if unit.memory_type.as_deref() == Some(ASYNCHRONOUS) {
            bytes_allocated /= 16;
        }
        Self {
            bram_bitsize,
            aligned_bitsize: 2 * bram_bitsize,
            bus_data: 2 * bram_bitsize,
            bus_addr: 15,
            bus_size: 7,
            bus_tag: 8,
            bytes_allocated,
            port_vector_ports,
        }
    }
}

/// Module parameters and init files of a memory unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySetup {
    /// Parameters to set on the unit instance, in order.
    pub parameters: Vec<(String, String)>,
    /// Init files to write next to the netlist.
    pub files: Vec<AuxiliaryFile>,
}

/// Returns `true` if the memory keeps its contents in two banks.
fn is_split(memory_type: &str, channels_type: &str) -> bool {
    memory_type == SYNCHRONOUS_UNALIGNED
        && (channels_type.contains(CHANNELS_NN)
            || (channels_type.contains(CHANNELS_N1) && !channels_type.contains(CHANNELS_11)))
}

/// Builds the parameters and random init contents of a memory unit.
pub fn memory_setup<R: Rng>(
    memory_type: &str,
    channels_type: &str,
    constants: &DeviceConstants,
    rng: &mut R,
) -> MemorySetup {
    let element_bits = constants.bus_data;
    let elements = constants.bytes_allocated / (element_bits / 8);
    let mut bram_bitsize = constants.bram_bitsize;
    if matches!(memory_type, ASYNCHRONOUS | SYNCHRONOUS_SDS | SYNCHRONOUS_SDS_BUS) {
        bram_bitsize = element_bits;
    }
    let line_bits = bram_bitsize as usize;

    let mut setup = MemorySetup::default();
    let mut param = |name: &str, value: String| setup.parameters.push((name.to_string(), value));
    param("address_space_begin", "0".to_string());
    param(
        "address_space_rangesize",
        ((element_bits / 8) * elements).to_string(),
    );
    param("USE_SPARSE_MEMORY", "1".to_string());

    let split = is_split(memory_type, channels_type);
    if split {
        param("MEMORY_INIT_file_a", format!("\"\"a_{INIT_FILE}\"\""));
        param("MEMORY_INIT_file_b", format!("\"\"b_{INIT_FILE}\"\""));
    } else {
        param("MEMORY_INIT_file", format!("\"\"{INIT_FILE}\"\""));
    }
    param("n_elements", elements.to_string());
    param("data_size", element_bits.to_string());
    param("BRAM_BITSIZE", bram_bitsize.to_string());
    param("BUS_PIPELINED", "1".to_string());
    param("PRIVATE_MEMORY", "0".to_string());

    if split {
        let total = (elements * bram_bitsize) as usize;
        let bits = random_bits(rng, total);
        let (mut bank_a, mut bank_b) = (String::new(), String::new());
        for (index, line) in bits.as_bytes().chunks(line_bits).enumerate() {
            let bank = if index % 2 == 0 { &mut bank_a } else { &mut bank_b };
            bank.push_str(&String::from_utf8_lossy(line));
            bank.push('\n');
        }
        setup.files.push(AuxiliaryFile {
            name: format!("a_{INIT_FILE}"),
            contents: bank_a,
        });
        setup.files.push(AuxiliaryFile {
            name: format!("b_{INIT_FILE}"),
            contents: bank_b,
        });
    } else {
        let total = (elements * element_bits) as usize;
        let bits = random_bits(rng, total);
        let mut contents = String::with_capacity(total + total / line_bits.max(1));
        for line in bits.as_bytes().chunks(line_bits) {
            contents.push_str(&String::from_utf8_lossy(line));
            contents.push('\n');
        }
        setup.files.push(AuxiliaryFile {
            name: INIT_FILE.to_string(),
            contents,
        });
    }
    setup
}

fn random_bits<R: Rng>(rng: &mut R, count: usize) -> String {
    (0..count)
        .map(|_| if rng.gen::<bool>() { '1' } else { '0' })
        .collect()
}
