//! A MODFLOW 6 simulation directory: `mfsim.nam` and everything it names.

use crate::blocks::BlockFile;
use crate::catalog::{ModelKind, PackageType};
use crate::dis::Dis;
use crate::disu::Disu;
use crate::disv::Disv;
use crate::error::{Error, Result};
use crate::namefile::{ModelNameFile, PackageRecord, SimulationNameFile};
use crate::tdis::Tdis;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const SIMULATION_NAME_FILE: &str = "mfsim.nam";

/// Contents of one package file. Discretizations are typed; every other
/// package keeps its blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PackageContent {
    Dis(Dis),
    Disv(Disv),
    Disu(Disu),
    Blocks(BlockFile),
}

impl PackageContent {
    fn read(package_type: PackageType, path: &Path) -> Result<Self> {
        Ok(match package_type.name() {
            "DIS" => PackageContent::Dis(Dis::read(path)?),
            "DISV" => PackageContent::Disv(Disv::read(path)?),
            "DISU" => PackageContent::Disu(Disu::read(path)?),
            _ => PackageContent::Blocks(BlockFile::read(path)?),
        })
    }

    pub fn to_block_file(&self) -> BlockFile {
        match self {
            PackageContent::Dis(dis) => dis.to_block_file(),
            PackageContent::Disv(disv) => disv.to_block_file(),
            PackageContent::Disu(disu) => disu.to_block_file(),
            PackageContent::Blocks(file) => file.clone(),
        }
    }

    /// Cell count when this is a discretization package.
    pub fn nodes(&self) -> Option<usize> {
        match self {
            PackageContent::Dis(dis) => Some(dis.nodes()),
            PackageContent::Disv(disv) => Some(disv.nodes()),
            PackageContent::Disu(disu) => Some(disu.nodes),
            PackageContent::Blocks(_) => None,
        }
    }
}

/// A file a package reads through `OPEN/CLOSE` or `FILEIN`, carried so the
/// simulation can be written to another directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalFile {
    /// Path relative to the simulation directory.
    pub fname: String,
    pub bytes: Vec<u8>,
}

impl ExternalFile {
    /// Read every relative file `blocks` names. Absolute paths are left
    /// where they are.
    fn read_all(dir: &Path, blocks: &BlockFile) -> Result<Vec<Self>> {
        blocks
            .external_files()
            .into_iter()
            .filter(|fname| Path::new(fname).is_relative())
            .map(|fname| -> Result<Self> {
                let path = dir.join(&fname);
                let bytes = fs::read(&path).map_err(|source| Error::Load {
                    path: path.clone(),
                    source: Box::new(source.into()),
                })?;
                tracing::debug!(fname = %fname, bytes = bytes.len(), "read external file");
                Ok(Self { fname, bytes })
            })
            .collect()
    }

    fn write(&self, dir: &Path) -> Result<()> {
        let path: PathBuf = dir.join(&self.fname);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &self.bytes)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPackage {
    pub record: PackageRecord,
    pub package_type: PackageType,
    pub content: PackageContent,
    pub external: Vec<ExternalFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub name: String,
    pub kind: ModelKind,
    /// Name file, relative to the simulation directory.
    pub fname: String,
    pub namefile: ModelNameFile,
    pub packages: Vec<ModelPackage>,
}

impl Model {
    fn load(dir: &Path, kind: ModelKind, fname: &str, name: &str) -> Result<Self> {
        let namefile = ModelNameFile::read(dir.join(fname))?;
        let types = namefile.package_types(kind, name)?;
        let packages = namefile
            .packages
            .iter()
            .zip(types)
            .map(|(record, package_type)| {
                tracing::debug!(model = name, ftype = %package_type, fname = %record.fname, "loading package");
                let content = PackageContent::read(package_type, &dir.join(&record.fname))?;
                let external = match &content {
                    PackageContent::Blocks(blocks) => ExternalFile::read_all(dir, blocks)?,
                    _ => Vec::new(),
                };
                Ok(ModelPackage {
                    record: record.clone(),
                    package_type,
                    content,
                    external,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(model = name, mtype = kind.mtype(), packages = packages.len(), "loaded model");

        Ok(Self {
            name: name.to_string(),
            kind,
            fname: fname.to_string(),
            namefile,
            packages,
        })
    }

    /// First package of the given file type, e.g. `NPF6`.
    pub fn package(&self, ftype: &str) -> Option<&ModelPackage> {
        let wanted = PackageType::from_ftype(self.kind, ftype)?;
        self.packages.iter().find(|p| p.package_type == wanted)
    }

    /// The model's DIS, DISV or DISU package.
    pub fn discretization(&self) -> Option<&PackageContent> {
        self.packages
            .iter()
            .map(|p| &p.content)
            .find(|c| c.nodes().is_some())
    }

    fn write(&self, dir: &Path) -> Result<()> {
        self.namefile.write(dir.join(&self.fname))?;
        for package in &self.packages {
            package.content.to_block_file().write(dir.join(&package.record.fname))?;
            for file in &package.external {
                file.write(dir)?;
            }
        }
        tracing::info!(model = %self.name, packages = self.packages.len(), "wrote model");
        Ok(())
    }
}

/// A file listed directly in `mfsim.nam` (solution or exchange).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationFile {
    pub fname: String,
    pub blocks: BlockFile,
    pub external: Vec<ExternalFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
    pub namefile: SimulationNameFile,
    pub tdis: Tdis,
    pub models: Vec<Model>,
    pub exchanges: Vec<SimulationFile>,
    pub solutions: Vec<SimulationFile>,
}

impl Simulation {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let namefile = SimulationNameFile::read(dir.join(SIMULATION_NAME_FILE))?;
        let tdis = Tdis::read(dir.join(&namefile.tdis))?;
        tracing::debug!(nper = tdis.nper(), "loaded tdis");

        let models = namefile
            .models
            .iter()
            .map(|m| Model::load(dir, m.mtype, &m.fname, &m.mname))
            .collect::<Result<Vec<_>>>()?;

        let exchanges = namefile
            .exchanges
            .iter()
            .map(|e| read_file(dir, &e.fname))
            .collect::<Result<Vec<_>>>()?;

        let solutions = namefile
            .solution_groups
            .iter()
            .flat_map(|g| &g.solutions)
            .map(|s| read_file(dir, &s.fname))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            dir = %dir.display(),
            models = models.len(),
            exchanges = exchanges.len(),
            "loaded simulation"
        );
        Ok(Self {
            namefile,
            tdis,
            models,
            exchanges,
            solutions,
        })
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn model_mut(&mut self, name: &str) -> Option<&mut Model> {
        self.models.iter_mut().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Drop a model and every solution and exchange reference to it.
    pub fn remove_model(&mut self, name: &str) -> Result<Model> {
        let index = self
            .models
            .iter()
            .position(|m| m.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownModel(name.to_string()))?;
        let model = self.models.remove(index);

        self.namefile.models.retain(|m| !m.mname.eq_ignore_ascii_case(name));
        for solution in self.namefile.solution_groups.iter_mut().flat_map(|g| &mut g.solutions) {
            solution.models.retain(|m| !m.eq_ignore_ascii_case(name));
        }
        let dropped: Vec<String> = self
            .namefile
            .exchanges
            .iter()
            .filter(|e| e.mname1.eq_ignore_ascii_case(name) || e.mname2.eq_ignore_ascii_case(name))
            .map(|e| e.fname.clone())
            .collect();
        self.namefile
            .exchanges
            .retain(|e| !dropped.contains(&e.fname));
        self.exchanges.retain(|f| !dropped.contains(&f.fname));
        tracing::info!(model = %model.name, exchanges = dropped.len(), "removed model");
        Ok(model)
    }

    /// Write every file into `dir`, creating it if needed.
    pub fn write(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        self.namefile.validate()?;
        self.namefile.write(dir.join(SIMULATION_NAME_FILE))?;
        self.tdis.write(dir.join(&self.namefile.tdis))?;
        for model in &self.models {
            model.write(dir)?;
        }
        for file in self.exchanges.iter().chain(&self.solutions) {
            file.blocks.write(dir.join(&file.fname))?;
            for external in &file.external {
                external.write(dir)?;
            }
        }
        tracing::info!(dir = %dir.display(), "wrote simulation");
        Ok(())
    }
}

fn read_file(dir: &Path, fname: &str) -> Result<SimulationFile> {
    let blocks = BlockFile::read(dir.join(fname))?;
    Ok(SimulationFile {
        fname: fname.to_string(),
        external: ExternalFile::read_all(dir, &blocks)?,
        blocks,
    })
}
