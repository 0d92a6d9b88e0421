//! structures related to processing parameters

use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::to_writer;

use crate::errors::{CgError, CgResult};

/// Shape of the profile collection and parameters of its synthetic generation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetParams {
    /// number of profiles
    pub nb_seqs: usize,
    /// number of loci in each profile
    pub schema_length: usize,
    /// allele codes are in [0, nb_types)
    pub nb_types: usize,
    /// mean number of loci mutated between a profile and its parent
    pub diversity: usize,
    /// seed of generation
    pub seed: u64,
}

impl DatasetParams {
    pub fn new(nb_seqs: usize, schema_length: usize, nb_types: usize, diversity: usize, seed: u64) -> Self {
        DatasetParams {
            nb_seqs,
            schema_length,
            nb_types,
            diversity,
            seed,
        }
    }
} // end of impl DatasetParams

impl Default for DatasetParams {
    fn default() -> Self {
        DatasetParams::new(200_000, 3500, 100, 100, 42)
    }
}

//===========================================================

/// How a bucket converting to a split chooses its dimension.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimPolicy {
    /// uniform in [0, schema_length), possibly a dimension already used by an ancestor
    Random,
    /// uniform among dimensions not used by an ancestor
    RandomExcludingAncestors,
}

impl Default for DimPolicy {
    fn default() -> Self {
        DimPolicy::Random
    }
}

/// Parameters of forest construction
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// number of trees
    nb_trees: usize,
    /// a bucket holding more than capacity ids is split
    capacity: usize,
    dim_policy: DimPolicy,
    /// if set, tree i draws its dimensions from a rng seeded with seed + i, else from entropy
    seed: Option<u64>,
}

impl ForestParams {
    pub fn new(nb_trees: usize, capacity: usize) -> Self {
        ForestParams {
            nb_trees,
            capacity,
            dim_policy: DimPolicy::default(),
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_dim_policy(mut self, dim_policy: DimPolicy) -> Self {
        self.dim_policy = dim_policy;
        self
    }

    pub fn get_nb_trees(&self) -> usize {
        self.nb_trees
    }

    pub fn get_capacity(&self) -> usize {
        self.capacity
    }

    pub fn get_dim_policy(&self) -> DimPolicy {
        self.dim_policy
    }

    pub fn get_seed(&self) -> Option<u64> {
        self.seed
    }

    /// true if other builds forests of the same shape : same number of trees, capacity and dimension policy.
    /// Seeds are not compared.
    pub fn same_shape(&self, other: &ForestParams) -> bool {
        self.nb_trees == other.nb_trees && self.capacity == other.capacity && self.dim_policy == other.dim_policy
    }

    pub fn check(&self) -> CgResult<()> {
        if self.nb_trees == 0 {
            return Err(CgError::InvalidParameters("forest needs at least one tree".to_string()));
        }
        if self.capacity == 0 {
            return Err(CgError::InvalidParameters("bucket capacity must be at least 1".to_string()));
        }
        Ok(())
    }
} // end of impl ForestParams

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams::new(10, 200)
    }
}

//======================================================================================

/// Parameters of the heuristic verifier
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeuristicParams {
    /// number of loci scanned at which the running mismatch count is tested
    pub checkpoints: Vec<usize>,
    /// quantile level of the bounds
    pub alpha: f64,
}

impl HeuristicParams {
    pub fn new(checkpoints: Vec<usize>, alpha: f64) -> Self {
        HeuristicParams { checkpoints, alpha }
    }
}

impl Default for HeuristicParams {
    fn default() -> Self {
        HeuristicParams::new(vec![10, 100, 1000, 2000], 0.01)
    }
}

//==========================================================================================

/// Gathers parameters used for dataset and forest construction.
/// Dumped beside the index so a reloaded index can be checked against the profile file.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingParams {
    dataset: DatasetParams,
    forest: ForestParams,
}

impl ProcessingParams {
    pub fn new(dataset: DatasetParams, forest: ForestParams) -> Self {
        ProcessingParams { dataset, forest }
    }

    pub fn get_dataset_params(&self) -> &DatasetParams {
        &self.dataset
    }

    pub fn get_forest_params(&self) -> &ForestParams {
        &self.forest
    }

    pub fn dump_json(&self, dirpath: &Path) -> CgResult<()> {
        //
        let filepath = dirpath.join("parameters.json");
        //
        log::info!("dumping ProcessingParams in json file : {:?}", filepath);
        //
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&filepath)
            .map_err(|e| {
                log::error!("ProcessingParams dump : dump could not open file {:?}", filepath.as_os_str());
                e
            })?;
        //
        let mut writer = BufWriter::new(file);
        to_writer(&mut writer, &self)?;
        //
        Ok(())
    } // end of dump_json

    /// reload from a json dump. Used to ensure coherence of a reloaded index with the profile file
    pub fn reload_json(dirpath: &Path) -> CgResult<Self> {
        log::info!("in reload_json");
        //
        let filepath = dirpath.join("parameters.json");
        let file = OpenOptions::new().read(true).open(&filepath).map_err(|e| {
            log::error!("ProcessingParams reload_json : reload could not open file {:?}", filepath.as_os_str());
            e
        })?;
        let reader = BufReader::new(file);
        let processing_params: Self = serde_json::from_reader(reader)?;
        //
        log::info!(
            "ProcessingParameters reload, nb_seqs : {}, nb trees : {}",
            processing_params.dataset.nb_seqs,
            processing_params.forest.nb_trees
        );
        //
        Ok(processing_params)
    } // end of reload_json
} // end of impl ProcessingParams

//=====================================================================================

// end of mod tests
