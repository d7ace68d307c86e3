//! Simulation (`mfsim.nam`) and model name files.

use crate::blocks::{Block, BlockFile};
use crate::catalog::{ModelKind, PackageType};
use crate::error::{Error, Result};
use modflow_core::parse_field;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub mtype: ModelKind,
    pub fname: String,
    pub mname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    /// e.g. `GWF6-GWF6`.
    pub exgtype: String,
    pub fname: String,
    pub mname1: String,
    pub mname2: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionRecord {
    /// e.g. `IMS6`.
    pub slntype: String,
    pub fname: String,
    pub models: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionGroup {
    pub number: usize,
    pub mxiter: Option<u32>,
    pub solutions: Vec<SolutionRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationNameFile {
    pub continue_on_failure: bool,
    pub nocheck: bool,
    pub memory_print_option: Option<String>,
    pub tdis: String,
    pub models: Vec<ModelRecord>,
    pub exchanges: Vec<ExchangeRecord>,
    pub solution_groups: Vec<SolutionGroup>,
}

impl SimulationNameFile {
    pub fn from_block_file(file: &BlockFile) -> Result<Self> {
        let mut namefile = SimulationNameFile::default();

        if let Some(options) = file.block("OPTIONS") {
            namefile.continue_on_failure = options.has("CONTINUE");
            namefile.nocheck = options.has("NOCHECK");
            namefile.memory_print_option = options.value("MEMORY_PRINT_OPTION").map(str::to_string);
        }

        let timing = file.require_block("TIMING")?;
        namefile.tdis = timing
            .value("TDIS6")
            .ok_or_else(|| Error::missing_keyword("TIMING", "TDIS6"))?
            .to_string();

        for record in &file.require_block("MODELS")?.records {
            let [mtype, fname, mname, ..] = record.as_slice() else {
                return Err(Error::package("mfsim.nam", format!("incomplete MODELS record {:?}", record)));
            };
            let mtype = ModelKind::from_mtype(mtype)
                .ok_or_else(|| Error::package("mfsim.nam", format!("unknown model type {}", mtype)))?;
            namefile.models.push(ModelRecord {
                mtype,
                fname: fname.clone(),
                mname: mname.clone(),
            });
        }

        if let Some(exchanges) = file.block("EXCHANGES") {
            for record in &exchanges.records {
                let [exgtype, fname, mname1, mname2, ..] = record.as_slice() else {
                    return Err(Error::package("mfsim.nam", format!("incomplete EXCHANGES record {:?}", record)));
                };
                if PackageType::from_ftype(ModelKind::Simulation, exgtype).is_none() {
                    return Err(Error::UnknownPackage {
                        model: "mfsim.nam".to_string(),
                        ftype: exgtype.clone(),
                    });
                }
                namefile.exchanges.push(ExchangeRecord {
                    exgtype: exgtype.to_ascii_uppercase(),
                    fname: fname.clone(),
                    mname1: mname1.clone(),
                    mname2: mname2.clone(),
                });
            }
        }

        for block in file.blocks_named("SOLUTIONGROUP") {
            let mut group = SolutionGroup {
                number: block.number().unwrap_or(namefile.solution_groups.len() + 1),
                mxiter: None,
                solutions: Vec::new(),
            };
            for record in &block.records {
                if record[0].eq_ignore_ascii_case("MXITER") {
                    let token = record
                        .get(1)
                        .ok_or_else(|| Error::missing_keyword("SOLUTIONGROUP", "MXITER value"))?;
                    group.mxiter = Some(parse_field(token, "MXITER")?);
                    continue;
                }
                let [slntype, fname, models @ ..] = record.as_slice() else {
                    return Err(Error::package("mfsim.nam", format!("incomplete SOLUTIONGROUP record {:?}", record)));
                };
                group.solutions.push(SolutionRecord {
                    slntype: slntype.to_ascii_uppercase(),
                    fname: fname.clone(),
                    models: models.to_vec(),
                });
            }
            namefile.solution_groups.push(group);
        }
        if namefile.solution_groups.is_empty() {
            return Err(Error::MissingBlock("SOLUTIONGROUP".to_string()));
        }

        namefile.validate()?;
        Ok(namefile)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Self::from_block_file(&BlockFile::parse(text)?)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_block_file(&BlockFile::read(path)?)
    }

    /// Model names are unique and every model a solution or exchange names
    /// is listed in MODELS.
    pub fn validate(&self) -> Result<()> {
        for (i, model) in self.models.iter().enumerate() {
            if self.models[..i]
                .iter()
                .any(|m| m.mname.eq_ignore_ascii_case(&model.mname))
            {
                return Err(Error::package("mfsim.nam", format!("model {} listed twice", model.mname)));
            }
        }
        let solved = self
            .solution_groups
            .iter()
            .flat_map(|g| &g.solutions)
            .flat_map(|s| &s.models);
        let exchanged = self
            .exchanges
            .iter()
            .flat_map(|e| [&e.mname1, &e.mname2]);
        for mname in solved.chain(exchanged) {
            if self.model(mname).is_none() {
                return Err(Error::UnknownModel(mname.clone()));
            }
        }
        Ok(())
    }

    pub fn model(&self, mname: &str) -> Option<&ModelRecord> {
        self.models.iter().find(|m| m.mname.eq_ignore_ascii_case(mname))
    }

    pub fn to_block_file(&self) -> BlockFile {
        let mut file = BlockFile::new();

        let mut options = Block::new("OPTIONS");
        if self.continue_on_failure {
            options.push_keyword("CONTINUE");
        }
        if self.nocheck {
            options.push_keyword("NOCHECK");
        }
        if let Some(option) = &self.memory_print_option {
            options.push_value("MEMORY_PRINT_OPTION", option);
        }
        file.push(options);

        let mut timing = Block::new("TIMING");
        timing.push_value("TDIS6", &self.tdis);
        file.push(timing);

        let mut models = Block::new("MODELS");
        for model in &self.models {
            models.push_record([model.mtype.mtype(), model.fname.as_str(), model.mname.as_str()]);
        }
        file.push(models);

        let mut exchanges = Block::new("EXCHANGES");
        for exchange in &self.exchanges {
            exchanges.push_record([&exchange.exgtype, &exchange.fname, &exchange.mname1, &exchange.mname2]);
        }
        file.push(exchanges);

        for group in &self.solution_groups {
            let mut block = Block::new("SOLUTIONGROUP").with_suffix(group.number);
            if let Some(mxiter) = group.mxiter {
                block.push_value("MXITER", mxiter);
            }
            for solution in &group.solutions {
                let mut record = vec![solution.slntype.clone(), solution.fname.clone()];
                record.extend(solution.models.iter().cloned());
                block.records.push(record);
            }
            file.push(block);
        }
        file
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_block_file().write(path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// As written in the name file, e.g. `DIS6`.
    pub ftype: String,
    pub fname: String,
    pub pname: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelNameFile {
    pub list: Option<String>,
    pub print_input: bool,
    pub print_flows: bool,
    pub save_flows: bool,
    pub newton: bool,
    pub under_relaxation: bool,
    pub packages: Vec<PackageRecord>,
}

impl ModelNameFile {
    pub fn from_block_file(file: &BlockFile) -> Result<Self> {
        let mut namefile = ModelNameFile::default();
        if let Some(options) = file.block("OPTIONS") {
            namefile.list = options.value("LIST").map(str::to_string);
            namefile.print_input = options.has("PRINT_INPUT");
            namefile.print_flows = options.has("PRINT_FLOWS");
            namefile.save_flows = options.has("SAVE_FLOWS");
            if let Some(newton) = options.find("NEWTON") {
                namefile.newton = true;
                namefile.under_relaxation = newton
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case("UNDER_RELAXATION"));
            }
        }

        for record in &file.require_block("PACKAGES")?.records {
            let [ftype, fname, rest @ ..] = record.as_slice() else {
                return Err(Error::package("model name file", format!("incomplete PACKAGES record {:?}", record)));
            };
            namefile.packages.push(PackageRecord {
                ftype: ftype.to_ascii_uppercase(),
                fname: fname.clone(),
                pname: rest.first().cloned(),
            });
        }
        Ok(namefile)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Self::from_block_file(&BlockFile::parse(text)?)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_block_file(&BlockFile::read(path)?)
    }

    /// Resolve every package record against the catalog of `kind`.
    pub fn package_types(&self, kind: ModelKind, mname: &str) -> Result<Vec<PackageType>> {
        self.packages
            .iter()
            .map(|p| {
                PackageType::from_ftype(kind, &p.ftype).ok_or_else(|| Error::UnknownPackage {
                    model: mname.to_string(),
                    ftype: p.ftype.clone(),
                })
            })
            .collect()
    }

    pub fn to_block_file(&self) -> BlockFile {
        let mut file = BlockFile::new();
        let mut options = Block::new("OPTIONS");
        if let Some(list) = &self.list {
            options.push_value("LIST", list);
        }
        if self.print_input {
            options.push_keyword("PRINT_INPUT");
        }
        if self.print_flows {
            options.push_keyword("PRINT_FLOWS");
        }
        if self.save_flows {
            options.push_keyword("SAVE_FLOWS");
        }
        if self.newton {
            if self.under_relaxation {
                options.push_record(["NEWTON", "UNDER_RELAXATION"]);
            } else {
                options.push_keyword("NEWTON");
            }
        }
        file.push(options);

        let mut packages = Block::new("PACKAGES");
        for package in &self.packages {
            let mut record = vec![package.ftype.clone(), package.fname.clone()];
            record.extend(package.pname.iter().cloned());
            packages.records.push(record);
        }
        file.push(packages);
        file
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_block_file().write(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MFSIM: &str = "\
BEGIN options
  CONTINUE
END options

BEGIN timing
  TDIS6 sim.tdis
END timing

BEGIN models
  gwf6 left.nam left
  gwf6 right.nam right
END models

BEGIN exchanges
  GWF6-GWF6 sim.gwfgwf left right
END exchanges

BEGIN solutiongroup 1
  MXITER 5
  IMS6 sim.ims left right
END solutiongroup
";

    #[test]
    fn parses_simulation_name_file() {
        let nam = SimulationNameFile::parse(MFSIM).unwrap();
        assert!(nam.continue_on_failure);
        assert_eq!(nam.tdis, "sim.tdis");
        assert_eq!(nam.models.len(), 2);
        assert_eq!(nam.models[1].mtype, ModelKind::Gwf);
        assert_eq!(nam.exchanges[0].mname2, "right");
        let group = &nam.solution_groups[0];
        assert_eq!(group.mxiter, Some(5));
        assert_eq!(group.solutions[0].models, ["left", "right"]);
    }

    #[test]
    fn solution_model_must_exist() {
        let text = MFSIM.replace("IMS6 sim.ims left right", "IMS6 sim.ims left middle");
        let err = SimulationNameFile::parse(&text).unwrap_err();
        assert!(matches!(err, Error::UnknownModel(name) if name == "middle"));
    }

    #[test]
    fn missing_timing_block_is_error() {
        let text = MFSIM.replace("BEGIN timing\n  TDIS6 sim.tdis\nEND timing\n", "");
        assert!(matches!(SimulationNameFile::parse(&text), Err(Error::MissingBlock(_))));
    }

    #[test]
    fn simulation_name_file_round_trip() {
        let nam = SimulationNameFile::parse(MFSIM).unwrap();
        let again = SimulationNameFile::parse(&nam.to_block_file().to_text()).unwrap();
        assert_eq!(again, nam);
    }

    #[test]
    fn model_name_file() {
        let text = "\
BEGIN options
  LIST model.lst
  SAVE_FLOWS
  NEWTON UNDER_RELAXATION
END options
BEGIN packages
  DIS6 model.disv disv
  NPF6 model.npf
  OBS6 model.obs
END packages
";
        let nam = ModelNameFile::parse(text).unwrap();
        assert_eq!(nam.list.as_deref(), Some("model.lst"));
        assert!(nam.save_flows && nam.newton && nam.under_relaxation);
        assert_eq!(nam.packages[0].pname.as_deref(), Some("disv"));
        assert_eq!(nam.package_types(ModelKind::Gwf, "model").unwrap().len(), 3);

        let again = ModelNameFile::parse(&nam.to_block_file().to_text()).unwrap();
        assert_eq!(again, nam);
    }

    #[test]
    fn transport_package_in_flow_model_rejected() {
        let nam = ModelNameFile::parse("BEGIN packages\n  ADV6 m.adv\nEND packages\n").unwrap();
        let err = nam.package_types(ModelKind::Gwf, "flow").unwrap_err();
        assert!(matches!(err, Error::UnknownPackage { .. }));
    }
}
