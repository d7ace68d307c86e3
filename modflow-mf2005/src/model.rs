//! The MODFLOW-2005 model: its packages, the unit table that binds them
//! to files, and the name file that ties everything together.

use crate::config::LoadOptions;
use crate::dis::Dis;
use crate::error::{Error, Result};
use crate::flwob::{FlowKind, Flwob};
use crate::gmg::Gmg;
use crate::hob::Hob;
use crate::package::{OutputFile, Package};
use crate::raw::RawPackage;
use crate::swt::Swt;
use modflow_core::units::FileRole;
use modflow_core::{ArrayContext, LineReader, NameFile, NameFileEntry, UnitRegistry};
use modflow_output::HobOutput;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const DEFAULT_LIST_UNIT: i32 = 2;

/// A package that could not be parsed and was kept as raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub ftype: String,
    pub fname: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    workspace: PathBuf,
    /// Directory the model was loaded from, where external array files live.
    source: Option<PathBuf>,
    list_unit: i32,
    list_fname: Option<String>,
    units: UnitRegistry,
    packages: Vec<Package>,
    load_failures: Vec<LoadFailure>,
}

impl Model {
    pub fn new(name: &str, workspace: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            workspace: workspace.into(),
            source: None,
            list_unit: DEFAULT_LIST_UNIT,
            list_fname: None,
            units: UnitRegistry::new(name),
            packages: Vec::new(),
            load_failures: Vec::new(),
        }
    }

    /// Read a model from its name file. Every package file is resolved
    /// relative to the directory holding the name file.
    pub fn load(nam_path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        let nam_path = nam_path.as_ref();
        let workspace = match nam_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let name = nam_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        let namefile = NameFile::read(nam_path)?;
        let mut model = Model::new(&name, &workspace);
        model.source = Some(workspace.clone());
        log_progress(options, &format!("loading {} from {}", name, nam_path.display()));

        let mut ctx = ArrayContext::new(&workspace);
        for entry in namefile.entries() {
            if entry.ftype == "LIST" {
                model.list_unit = entry.unit;
                model.list_fname = Some(entry.fname.clone());
            } else if entry.is_data() {
                model
                    .units
                    .add_output(entry.unit, Some(&entry.fname), "", entry.is_binary(), None)?;
                ctx = ctx.with_external_unit(entry.unit, &entry.fname);
            }
        }

        let dis_entry = namefile.by_ftype("DIS").ok_or(Error::MissingDis)?;
        let dis = read_dis(dis_entry, &workspace, &mut ctx).map_err(|e| load_error(dis_entry, e))?;
        log_progress(options, &format!("loaded DIS from {}", dis_entry.fname));

        let mut loaded: Vec<(Package, &NameFileEntry)> = Vec::new();
        for entry in namefile.entries() {
            if entry.ftype == "LIST" || entry.ftype == "DIS" || entry.is_data() {
                continue;
            }
            if !options.wants(&entry.ftype) {
                tracing::debug!(ftype = %entry.ftype, "skipping package not in load_only");
                continue;
            }
            let package = match read_package(entry, &dis, &workspace, &mut ctx) {
                Ok(package) => package,
                Err(err) if options.forgive => {
                    tracing::warn!(ftype = %entry.ftype, fname = %entry.fname, error = %err, "keeping package as raw text");
                    model.load_failures.push(LoadFailure {
                        ftype: entry.ftype.clone(),
                        fname: entry.fname.clone(),
                        message: err.to_string(),
                    });
                    RawPackage::read(&workspace.join(&entry.fname), &entry.ftype, entry.unit)
                        .map_err(|e| load_error(entry, e))?
                        .into()
                }
                Err(err) => return Err(load_error(entry, err)),
            };
            log_progress(options, &format!("loaded {} from {}", entry.ftype, entry.fname));
            loaded.push((package, entry));
        }

        model.add_package_with_filenames(dis, &[&dis_entry.fname])?;
        for (package, entry) in loaded {
            model.add_package_with_filenames(package, &[&entry.fname])?;
        }

        if options.check {
            for issue in model.check() {
                tracing::warn!("{}", issue);
            }
        }
        Ok(model)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the model. Files whose names were derived from the model
    /// name follow the new name.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.units.set_model_name(name);
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn list_unit(&self) -> i32 {
        self.list_unit
    }

    pub fn list_file_name(&self) -> String {
        self.list_fname
            .clone()
            .unwrap_or_else(|| format!("{}.list", self.name))
    }

    pub fn name_file_path(&self) -> PathBuf {
        self.workspace.join(format!("{}.nam", self.name))
    }

    pub fn units(&self) -> &UnitRegistry {
        &self.units
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn load_failures(&self) -> &[LoadFailure] {
        &self.load_failures
    }

    /// `(nrow, ncol, nlay, nper)` from the DIS package.
    pub fn dimensions(&self) -> Result<(usize, usize, usize, usize)> {
        let dis = self.dis().ok_or(Error::MissingDis)?;
        Ok((dis.nrow, dis.ncol, dis.nlay, dis.nper()))
    }

    pub fn add_package(&mut self, package: impl Into<Package>) -> Result<()> {
        self.add_package_with_filenames(package, &[])
    }

    /// Add a package, naming its input file and then its output files in
    /// the order the package lists them. Missing names default to
    /// `<model>.<extension>`. A package of the same type is replaced; if
    /// the new package cannot be registered the model is left unchanged.
    pub fn add_package_with_filenames(&mut self, package: impl Into<Package>, filenames: &[&str]) -> Result<()> {
        let package = package.into();
        let ftype = package.ftype().to_string();
        let saved_units = self.units.clone();
        let replaced = match self.packages.iter().position(|p| p.ftype().eq_ignore_ascii_case(&ftype)) {
            Some(index) => {
                tracing::warn!(ftype = %ftype, "replacing existing package");
                Some((index, self.remove_package(&ftype)?))
            }
            None => None,
        };

        if let Err(err) = self.register(&package, &ftype, filenames) {
            self.units = saved_units;
            if let Some((index, old)) = replaced {
                self.packages.insert(index, old);
            }
            return Err(err);
        }
        tracing::debug!(ftype = %ftype, unit = package.unit(), "added package");
        self.packages.push(package);
        Ok(())
    }

    fn register(&mut self, package: &Package, ftype: &str, filenames: &[&str]) -> Result<()> {
        let data = package.data();
        self.units
            .add_input(ftype, data.unit(), filenames.first().copied(), data.extension())?;
        for (i, output) in data.output_files().iter().enumerate() {
            self.register_output(output, filenames.get(i + 1).copied(), ftype)?;
        }
        Ok(())
    }

    fn register_output(&mut self, output: &OutputFile, fname: Option<&str>, ftype: &str) -> Result<()> {
        if let Some(existing) = self.units.get(output.unit) {
            if existing.role == FileRole::Output {
                match fname {
                    Some(name) if name != existing.fname => {
                        self.units.remove_output(output.unit);
                    }
                    _ => {
                        self.units.claim_output(output.unit, ftype);
                        return Ok(());
                    }
                }
            }
        }
        self.units
            .add_output(output.unit, fname, &output.extension, output.binary, Some(ftype))?;
        Ok(())
    }

    /// Remove a package together with its input file and the output
    /// files it registered.
    pub fn remove_package(&mut self, ftype: &str) -> Result<Package> {
        let index = self
            .packages
            .iter()
            .position(|p| p.ftype().eq_ignore_ascii_case(ftype))
            .ok_or_else(|| Error::PackageNotFound(ftype.to_uppercase()))?;
        let package = self.packages.remove(index);
        self.units.remove(package.unit());
        self.units.remove_package_outputs(package.ftype());
        tracing::debug!(ftype = %package.ftype(), "removed package");
        Ok(package)
    }

    pub fn package(&self, ftype: &str) -> Option<&Package> {
        self.packages
            .iter()
            .find(|p| p.ftype().eq_ignore_ascii_case(ftype))
    }

    pub fn dis(&self) -> Option<&Dis> {
        self.packages.iter().find_map(|p| match p {
            Package::Dis(dis) => Some(dis),
            _ => None,
        })
    }

    pub fn hob(&self) -> Option<&Hob> {
        self.packages.iter().find_map(|p| match p {
            Package::Hob(hob) => Some(hob),
            _ => None,
        })
    }

    pub fn flwob(&self, kind: FlowKind) -> Option<&Flwob> {
        self.packages.iter().find_map(|p| match p {
            Package::Flwob(flwob) if flwob.kind == kind => Some(flwob),
            _ => None,
        })
    }

    pub fn swt(&self) -> Option<&Swt> {
        self.packages.iter().find_map(|p| match p {
            Package::Swt(swt) => Some(swt.as_ref()),
            _ => None,
        })
    }

    pub fn gmg(&self) -> Option<&Gmg> {
        self.packages.iter().find_map(|p| match p {
            Package::Gmg(gmg) => Some(gmg),
            _ => None,
        })
    }

    /// File name bound to an output unit.
    pub fn get_output(&self, unit: i32) -> Option<&str> {
        self.units.output_name(unit)
    }

    /// Register an output file no package knows about, e.g. a budget file
    /// named by a raw package.
    pub fn add_output_file(&mut self, unit: i32, fname: Option<&str>, extension: &str, binary: bool) -> Result<()> {
        self.units.add_output(unit, fname, extension, binary, None)?;
        Ok(())
    }

    /// Write to `workspace` from now on. Packages are held in memory; the
    /// external array files raw packages read are copied over by
    /// [`Model::write_input`].
    pub fn change_workspace(&mut self, workspace: impl Into<PathBuf>) {
        self.workspace = workspace.into();
        tracing::info!(workspace = %self.workspace.display(), "changed model workspace");
    }

    /// Write every package and then the name file.
    pub fn write_input(&self) -> Result<()> {
        fs::create_dir_all(&self.workspace)?;
        let dis = self.dis();
        for package in &self.packages {
            let entry = self
                .units
                .input_by_ftype(package.ftype())
                .ok_or_else(|| Error::PackageNotFound(package.ftype().to_string()))?;
            let text = package.data().to_text(dis)?;
            fs::write(self.workspace.join(&entry.fname), text)?;
            tracing::info!(ftype = %package.ftype(), fname = %entry.fname, "wrote package");
        }

        self.copy_external_files()?;

        let namefile = NameFile::from_registry(self.list_unit, &self.list_file_name(), &self.units);
        let path = self.name_file_path();
        namefile.write(&path)?;
        tracing::info!(path = %path.display(), "wrote name file");
        Ok(())
    }

    /// Copy the `OPEN/CLOSE` files and `EXTERNAL` units that raw packages
    /// read from the load directory into the current workspace.
    fn copy_external_files(&self) -> Result<()> {
        let Some(source) = self.source.as_ref().filter(|s| **s != self.workspace) else {
            return Ok(());
        };
        let mut fnames = Vec::new();
        for package in &self.packages {
            let Package::Raw(raw) = package else { continue };
            fnames.extend(raw.external_files());
            fnames.extend(
                raw.external_units()
                    .into_iter()
                    .filter_map(|unit| self.units.get(unit))
                    .filter(|entry| entry.role == FileRole::Output && entry.package.is_none())
                    .map(|entry| entry.fname.clone()),
            );
        }
        fnames.sort();
        fnames.dedup();

        for fname in fnames.iter().filter(|f| Path::new(f).is_relative()) {
            let from = source.join(fname);
            if !from.is_file() {
                tracing::warn!(fname = %fname, source = %source.display(), "external file not found");
                continue;
            }
            let to = self.workspace.join(fname);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&from, &to)?;
            tracing::debug!(fname = %fname, "copied external file");
        }
        Ok(())
    }

    /// Consistency problems of every package against the grid.
    pub fn check(&self) -> Vec<String> {
        let Some(dis) = self.dis() else {
            return vec![Error::MissingDis.to_string()];
        };
        self.packages
            .iter()
            .flat_map(|p| p.data().check(dis))
            .collect()
    }

    /// Read the simulated-versus-observed table the HOB package asked for.
    pub fn read_hob_output(&self) -> Result<HobOutput> {
        let hob = self
            .hob()
            .ok_or_else(|| Error::PackageNotFound("HOB".to_string()))?;
        let fname = self
            .get_output(hob.iuhobsv)
            .ok_or_else(|| Error::package("HOB", format!("no output file on unit {}", hob.iuhobsv)))?;
        Ok(HobOutput::read(self.workspace.join(fname))?)
    }
}

fn log_progress(options: &LoadOptions, message: &str) {
    if options.verbose {
        tracing::info!("{}", message);
    } else {
        tracing::debug!("{}", message);
    }
}

fn load_error(entry: &NameFileEntry, source: Error) -> Error {
    Error::Load {
        ftype: entry.ftype.clone(),
        fname: entry.fname.clone(),
        source: Box::new(source),
    }
}

fn open(workspace: &Path, fname: &str) -> Result<LineReader<BufReader<File>>> {
    let file = File::open(workspace.join(fname))?;
    Ok(LineReader::new(BufReader::new(file)))
}

fn read_dis(entry: &NameFileEntry, workspace: &Path, ctx: &mut ArrayContext) -> Result<Dis> {
    let mut reader = open(workspace, &entry.fname)?;
    ctx.set_package_unit(Some(entry.unit));
    Dis::load(&mut reader, entry.unit, ctx)
}

fn read_package(entry: &NameFileEntry, dis: &Dis, workspace: &Path, ctx: &mut ArrayContext) -> Result<Package> {
    let unit = entry.unit;
    let ftype = entry.ftype.as_str();
    if let Some(kind) = FlowKind::from_ftype(ftype) {
        let mut reader = open(workspace, &entry.fname)?;
        return Ok(Flwob::load(&mut reader, kind, unit)?.into());
    }
    let package = match ftype {
        "HOB" => Hob::load(&mut open(workspace, &entry.fname)?, unit, dis)?.into(),
        "SWT" => {
            ctx.set_package_unit(Some(unit));
            Swt::load(&mut open(workspace, &entry.fname)?, unit, dis, ctx)?.into()
        }
        "GMG" => Gmg::load(&mut open(workspace, &entry.fname)?, unit)?.into(),
        _ => RawPackage::read(&workspace.join(&entry.fname), ftype, unit)?.into(),
    };
    Ok(package)
}
