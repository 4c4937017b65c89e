//! Device container owning the equation table and the primary matrix.

use log::debug;
use nalgebra::DVector;
use num_complex::Complex;
use num_traits::Zero;
use smallsig_core::{EquationTable, NodeId, SparseMatrix};

use crate::device::{Device, SourceInfo};
use crate::error::{Error, Result};
use crate::noise::NoiseGenerator;

/// A set of devices sharing one admittance matrix.
///
/// Call [`Circuit::setup`] after adding devices; it creates internal
/// unknowns, binds every matrix handle and finalizes the structure. Adding
/// a device or node afterwards tears the structure down so the next `setup`
/// rebinds.
#[derive(Debug, Default)]
pub struct Circuit {
    equations: EquationTable,
    devices: Vec<Box<dyn Device>>,
    declared: usize,
    matrix: Option<SparseMatrix>,
    ready: bool,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a named node. A new node after setup tears the
    /// structure down so the next `setup` resizes and rebinds.
    pub fn node(&mut self, name: &str) -> NodeId {
        let before = self.equations.len();
        let id = self.equations.node(name);
        if self.equations.len() != before {
            self.teardown();
        }
        id
    }

    /// Add a device and return its index.
    pub fn add<D: Device + 'static>(&mut self, device: D) -> usize {
        self.teardown();
        self.devices.push(Box::new(device));
        self.devices.len() - 1
    }

    /// Declare unknowns, size the matrix and bind all handles.
    pub fn setup(&mut self) -> Result<()> {
        if self.ready {
            return Ok(());
        }
        for device in &mut self.devices[self.declared..] {
            device.declare(&mut self.equations)?;
        }
        self.declared = self.devices.len();

        let size = self.equations.len();
        let mut matrix = match self.matrix.take() {
            Some(m) if m.size() == size => m,
            _ => SparseMatrix::new(size),
        };
        for device in &mut self.devices {
            device.setup(&mut matrix)?;
        }
        matrix.finalize();
        debug!(
            "circuit setup: {} devices, {} unknowns, {} entries",
            self.devices.len(),
            size,
            matrix.nnz()
        );
        self.matrix = Some(matrix);
        self.ready = true;
        Ok(())
    }

    /// Invalidate every bound handle. The next `setup` rebinds.
    pub fn teardown(&mut self) {
        if self.ready {
            if let Some(matrix) = self.matrix.as_mut() {
                matrix.teardown();
            }
            self.ready = false;
        }
    }

    pub fn is_setup(&self) -> bool {
        self.ready
    }

    /// Matrix dimension (number of non-ground unknowns).
    pub fn size(&self) -> usize {
        self.equations.len()
    }

    pub fn equations(&self) -> &EquationTable {
        &self.equations
    }

    /// Resolve a node voltage by name.
    pub fn find_node(&self, name: &str) -> Result<NodeId> {
        self.equations
            .find_node(name)
            .map_err(|_| Error::NodeUndefined(name.to_string()))
    }

    /// Resolve an independent source by (case-insensitive) name.
    pub fn find_source(&self, name: &str) -> Result<SourceInfo> {
        self.devices
            .iter()
            .filter(|d| d.name().eq_ignore_ascii_case(name))
            .find_map(|d| d.source())
            .ok_or_else(|| Error::SourceUndefined(name.to_string()))
    }

    pub fn devices(&self) -> impl Iterator<Item = &dyn Device> {
        self.devices.iter().map(|d| d.as_ref())
    }

    pub fn device(&self, name: &str) -> Option<&dyn Device> {
        self.devices().find(|d| d.name() == name)
    }

    /// Typed access to a device by name.
    pub fn device_as<T: 'static>(&self, name: &str) -> Option<&T> {
        self.device(name).and_then(|d| d.as_any().downcast_ref::<T>())
    }

    /// Typed mutable access, e.g. to install a new operating point.
    pub fn device_as_mut<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.devices
            .iter_mut()
            .find(|d| d.name() == name)
            .and_then(|d| d.as_any_mut().downcast_mut::<T>())
    }

    /// Clear the matrix and stamp every device at angular frequency `omega`.
    pub fn load_ac(&mut self, omega: f64) -> Result<()> {
        let matrix = begin_load(&mut self.matrix, self.ready)?;
        for device in &mut self.devices {
            device.ac_stamp(matrix, omega);
        }
        matrix.freeze();
        Ok(())
    }

    /// Clear the matrix and stamp every device's pole-zero variant at `s`.
    pub fn load_pz(&mut self, s: Complex<f64>) -> Result<()> {
        let matrix = begin_load(&mut self.matrix, self.ready)?;
        for device in &self.devices {
            device.pz_stamp(matrix, s);
        }
        matrix.freeze();
        Ok(())
    }

    /// The primary matrix after the last load pass.
    pub fn matrix(&self) -> Result<&SparseMatrix> {
        match (&self.matrix, self.ready) {
            (Some(m), true) => Ok(m),
            _ => Err(Error::NotSetUp),
        }
    }

    /// Right-hand side carrying every source's AC phasor.
    pub fn ac_excitation(&self) -> DVector<Complex<f64>> {
        let mut rhs = DVector::from_element(self.size(), Complex::zero());
        for info in self.devices().filter_map(|d| d.source()) {
            info.excite(&mut rhs, info.ac);
        }
        rhs
    }

    /// Noise generators of every device at `frequency`.
    pub fn noise_generators(&self, frequency: f64) -> Vec<NoiseGenerator> {
        self.devices()
            .flat_map(|d| d.noise_generators(frequency))
            .collect()
    }
}

fn begin_load(matrix: &mut Option<SparseMatrix>, ready: bool) -> Result<&mut SparseMatrix> {
    match matrix.as_mut() {
        Some(m) if ready => {
            m.clear();
            Ok(m)
        }
        _ => Err(Error::NotSetUp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passive::Resistor;
    use crate::sources::VoltageSource;

    fn divider() -> Circuit {
        let mut ckt = Circuit::new();
        let input = ckt.node("in");
        let out = ckt.node("out");
        ckt.add(VoltageSource::new("V1", input, NodeId::GROUND, 1.0).with_ac(1.0, 0.0));
        ckt.add(Resistor::new("R1", input, out, 1000.0));
        ckt.add(Resistor::new("R2", out, NodeId::GROUND, 1000.0));
        ckt
    }

    #[test]
    fn test_setup_sizes_matrix() {
        let mut ckt = divider();
        ckt.setup().unwrap();
        assert_eq!(ckt.size(), 3);
        assert!(ckt.is_setup());
    }

    #[test]
    fn test_load_before_setup_fails() {
        let mut ckt = divider();
        assert!(matches!(ckt.load_ac(0.0), Err(Error::NotSetUp)));
    }

    #[test]
    fn test_lookup_errors() {
        let mut ckt = divider();
        ckt.setup().unwrap();
        assert!(matches!(ckt.find_node("nope"), Err(Error::NodeUndefined(_))));
        assert!(matches!(ckt.find_node("V1#branch"), Err(Error::NodeUndefined(_))));
        assert!(matches!(ckt.find_source("R1"), Err(Error::SourceUndefined(_))));
        assert!(ckt.find_source("v1").is_ok());
    }

    #[test]
    fn test_add_after_setup_rebinds() {
        let mut ckt = divider();
        ckt.setup().unwrap();
        let out = ckt.node("out");
        ckt.add(Resistor::new("R3", out, NodeId::GROUND, 1000.0));
        assert!(!ckt.is_setup());
        ckt.setup().unwrap();
        ckt.load_ac(0.0).unwrap();
        let out_idx = out.index().unwrap();
        let g = ckt.matrix().unwrap().get(out_idx, out_idx).unwrap();
        assert!((g.re - 3e-3).abs() < 1e-15);
    }

    #[test]
    fn test_new_node_after_setup_resizes() {
        let mut ckt = divider();
        ckt.setup().unwrap();
        assert_eq!(ckt.node("out"), ckt.find_node("out").unwrap());
        assert!(ckt.is_setup());

        let mid = ckt.node("mid");
        assert!(!ckt.is_setup());
        assert!(matches!(ckt.load_ac(0.0), Err(Error::NotSetUp)));

        ckt.setup().unwrap();
        ckt.load_ac(0.0).unwrap();
        assert_eq!(ckt.size(), 4);
        assert_eq!(ckt.matrix().unwrap().size(), 4);
        let i = mid.index().unwrap();
        assert_eq!(ckt.matrix().unwrap().get(i, i), None);
    }

    #[test]
    fn test_ac_excitation() {
        let mut ckt = divider();
        ckt.setup().unwrap();
        let rhs = ckt.ac_excitation();
        let br = ckt.find_source("V1").unwrap().branch().unwrap();
        assert_eq!(rhs[br.index().unwrap()], Complex::new(1.0, 0.0));
    }
}
