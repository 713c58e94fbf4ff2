//! Writing and reading matrix exports.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use wardrop_network::{DelayFamily, Network};

use crate::types::{CooMatrix, MatrixExport};
use crate::{ExportError, ExportResult};

/// Assemble the export for an affine network.
///
/// `None` for any other family, for mixed families and for networks without links.
pub fn build_export(network: &Network) -> ExportResult<Option<MatrixExport>> {
    if network.delay_family().ok() != Some(DelayFamily::Affine) {
        return Ok(None);
    }

    let mut incidence = CooMatrix::new(network.num_nodes(), network.num_links());
    for (row, col, value) in network.incidence_entries() {
        incidence.push(row, col, value);
    }

    Ok(Some(MatrixExport {
        incidence,
        d: network.net_demands().iter().copied().collect(),
        p: network.slopes()?.iter().copied().collect(),
        q: network.ffdelays().iter().copied().collect(),
    }))
}

/// Write `<dir>/<name>.json` for affine networks.
///
/// Networks of any other delay family are skipped and `Ok(None)` is returned.
pub fn save_matrices(dir: &Path, name: &str, network: &Network) -> ExportResult<Option<PathBuf>> {
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(ExportError::InvalidName {
            name: name.to_string(),
        });
    }

    let Some(export) = build_export(network)? else {
        match network.delay_family() {
            Ok(family) => warn!(%family, "Matrix export only supports affine networks; skipping"),
            Err(e) => warn!(error = %e, "Matrix export needs a uniform delay family; skipping"),
        }
        return Ok(None);
    };

    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{name}.json"));
    let json = serde_json::to_string_pretty(&export)?;
    fs::write(&path, json)?;

    info!(path = %path.display(), nnz = export.incidence.nnz(), "Saved matrices");
    Ok(Some(path))
}

pub fn load_matrices(path: &Path) -> ExportResult<MatrixExport> {
    let content = fs::read_to_string(path)?;
    let export = serde_json::from_str(&content)?;
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardrop_network::DelayFunction;

    fn chain(func: DelayFunction) -> Network {
        let mut net = Network::new();
        let a = net.add_node(None);
        let b = net.add_node(None);
        let c = net.add_node(None);
        net.add_link(a, b, 1, func.clone()).unwrap();
        net.add_link(b, c, 1, func).unwrap();
        net.add_od(a, c, 2.5).unwrap();
        net
    }

    #[test]
    fn affine_export_has_incidence_and_coefficients() {
        let net = chain(DelayFunction::affine(1.5, 0.25));
        let export = build_export(&net).unwrap().unwrap();

        assert_eq!(
            export.incidence.to_dense(),
            vec![vec![-1.0, 0.0], vec![1.0, -1.0], vec![0.0, 1.0]]
        );
        assert_eq!(export.d, vec![-2.5, 0.0, 2.5]);
        assert_eq!(export.p, vec![0.25, 0.25]);
        assert_eq!(export.q, vec![1.5, 1.5]);
    }

    #[test]
    fn polynomial_network_is_not_exported() {
        let net = chain(DelayFunction::polynomial(1.0, 1.0, vec![1.0]));
        assert!(build_export(&net).unwrap().is_none());
    }

    #[test]
    fn mixed_or_empty_network_is_not_exported() {
        let mut mixed = chain(DelayFunction::affine(1.0, 1.0));
        let a = mixed.nodes()[0].id;
        let c = mixed.nodes()[2].id;
        mixed.add_link(a, c, 1, DelayFunction::None).unwrap();
        assert!(build_export(&mixed).unwrap().is_none());

        assert!(build_export(&Network::new()).unwrap().is_none());
    }

    #[test]
    fn serialized_field_names() {
        let net = chain(DelayFunction::affine(1.0, 1.0));
        let export = build_export(&net).unwrap().unwrap();
        let value = serde_json::to_value(&export).unwrap();
        for key in ["C", "d", "p", "q"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["C"]["rows"], 3);
    }

    #[test]
    fn rejects_path_like_names() {
        let net = chain(DelayFunction::affine(1.0, 1.0));
        let dir = std::env::temp_dir();
        assert!(matches!(
            save_matrices(&dir, "../escape", &net),
            Err(ExportError::InvalidName { .. })
        ));
        assert!(matches!(
            save_matrices(&dir, "", &net),
            Err(ExportError::InvalidName { .. })
        ));
    }
}
