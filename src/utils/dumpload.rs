//! a small module dedicated to dump reload of the forest and processing parameters
//!
//! A dump directory contains the binary dump of the forest in "forest.bin" and the parameters used
//! to build it in "parameters.json".

use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::SystemTime;

use crate::errors::CgResult;
use crate::index::Forest;
use crate::seqstore::SeqStore;
use crate::utils::parameters::ProcessingParams;

/// name of the forest dump in a dump directory
pub const FOREST_DUMP_NAME: &str = "forest.bin";

/// binary dump of forest in file path
pub fn dump_forest(forest: &Forest, path: &Path) -> CgResult<()> {
    log::info!("dumping forest of {} trees in {:?}", forest.get_nb_trees(), path);
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| {
            log::error!("dump_forest : could not open file {:?}", path.as_os_str());
            e
        })?;
    let mut writer = BufWriter::new(file);
    let bytes = forest.to_bytes()?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    log::info!("forest dump ended, nb bytes : {}", bytes.len());
    Ok(())
} // end of dump_forest

/// reload a forest dumped by dump_forest
pub fn reload_forest(path: &Path) -> CgResult<Forest> {
    log::info!("reload_forest, loading forest from {:?}", path);
    let file = OpenOptions::new().read(true).open(path).map_err(|e| {
        log::error!("reload_forest : could not open file {:?}", path.as_os_str());
        e
    })?;
    let start_t = SystemTime::now();
    let mut reader = BufReader::new(file);
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let forest = Forest::from_bytes(&bytes)?;
    let elapsed_t = start_t.elapsed().map(|d| d.as_secs_f32()).unwrap_or(0.);
    log::info!(
        "reload_forest : {} trees, size {}, elapsed system time(s) {}",
        forest.get_nb_trees(),
        forest.size(),
        elapsed_t
    );
    Ok(forest)
} // end of reload_forest

/// reload a forest and checks it indexes store. If not the index must be rebuilt.
pub fn reload_checked<S: SeqStore>(path: &Path, store: &S) -> CgResult<Forest> {
    let forest = reload_forest(path)?;
    forest.check_store(store)?;
    Ok(forest)
}

// This function dumps forest and processing params in the same directory given by dump_dir
pub fn dumpall(dump_dir: &Path, forest: &Forest, processing_params: &ProcessingParams) -> CgResult<()> {
    std::fs::create_dir_all(dump_dir)?;
    dump_forest(forest, &dump_dir.join(FOREST_DUMP_NAME))?;
    processing_params.dump_json(dump_dir)?;
    Ok(())
} // end of dumpall

/// reloads forest and parameters from dump_dir, checking the forest indexes store
pub fn reloadall<S: SeqStore>(dump_dir: &Path, store: &S) -> CgResult<(Forest, ProcessingParams)> {
    let processing_params = ProcessingParams::reload_json(dump_dir)?;
    let forest = reload_checked(&dump_dir.join(FOREST_DUMP_NAME), store)?;
    Ok((forest, processing_params))
} // end of reloadall

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::errors::CgError;
    use crate::synth::create_around_reference;
    use crate::utils::parameters::{DatasetParams, ForestParams};

    #[test]
    fn dump_reload_all() {
        let (store, _) = create_around_reference(150, 20, 4, 51).unwrap();
        let forest_params = ForestParams::new(3, 5).with_seed(51);
        let forest = Forest::build(&store, forest_params).unwrap();
        let params = ProcessingParams::new(DatasetParams::new(150, 20, 4, 0, 51), forest_params);
        //
        let dir = tempfile::tempdir().unwrap();
        let dump_dir = dir.path().join("index");
        dumpall(&dump_dir, &forest, &params).unwrap();
        let (reloaded, reloaded_params) = reloadall(&dump_dir, &store).unwrap();
        assert_eq!(reloaded_params, params);
        assert_eq!(reloaded.size(), forest.size());
        for id in 0..store.len() {
            assert_eq!(reloaded.query(store.get(id)).unwrap(), forest.query(store.get(id)).unwrap());
        }
        // a store of another size is refused
        let (other, _) = create_around_reference(160, 20, 4, 51).unwrap();
        assert!(matches!(
            reloadall(&dump_dir, &other),
            Err(CgError::IndexDatasetMismatch { .. })
        ));
    }

    #[test]
    fn reload_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            reload_forest(&dir.path().join("nothing.bin")),
            Err(CgError::Io(_))
        ));
    }
} // end of mod tests
