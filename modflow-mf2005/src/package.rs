//! Common interface of the packages a model holds.

use crate::dis::Dis;
use crate::error::Result;
use crate::flwob::{FlowKind, Flwob};
use crate::gmg::Gmg;
use crate::hob::Hob;
use crate::raw::RawPackage;
use crate::swt::Swt;
use std::fmt;

/// An output file a package asks the simulator to write.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    pub unit: i32,
    pub extension: String,
    pub binary: bool,
}

impl OutputFile {
    pub fn text(unit: i32, extension: &str) -> Self {
        Self {
            unit,
            extension: extension.to_string(),
            binary: false,
        }
    }

    pub fn binary(unit: i32, extension: &str) -> Self {
        Self {
            unit,
            extension: extension.to_string(),
            binary: true,
        }
    }
}

pub trait PackageData: fmt::Debug {
    /// Name-file type, e.g. `HOB`.
    fn ftype(&self) -> &str;
    fn unit(&self) -> i32;
    fn set_unit(&mut self, unit: i32);
    /// Extension of the default input file name.
    fn extension(&self) -> &str;
    /// Full file contents. `dis` is needed by packages that convert
    /// between stress periods and simulation time or size arrays by layer.
    fn to_text(&self, dis: Option<&Dis>) -> Result<String>;

    fn output_files(&self) -> Vec<OutputFile> {
        Vec::new()
    }

    /// Consistency problems against the model grid.
    fn check(&self, _dis: &Dis) -> Vec<String> {
        Vec::new()
    }

    fn heading(&self) -> String {
        format!("# {} package for MODFLOW-2005 written by modflow-mf2005", self.ftype())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    Dis,
    Hob,
    Flwob(FlowKind),
    Swt,
    Gmg,
    Raw,
}

#[derive(Debug, Clone)]
pub enum Package {
    Dis(Dis),
    Hob(Hob),
    Flwob(Flwob),
    Swt(Box<Swt>),
    Gmg(Gmg),
    Raw(RawPackage),
}

impl Package {
    pub fn kind(&self) -> PackageKind {
        match self {
            Package::Dis(_) => PackageKind::Dis,
            Package::Hob(_) => PackageKind::Hob,
            Package::Flwob(p) => PackageKind::Flwob(p.kind),
            Package::Swt(_) => PackageKind::Swt,
            Package::Gmg(_) => PackageKind::Gmg,
            Package::Raw(_) => PackageKind::Raw,
        }
    }

    pub fn data(&self) -> &dyn PackageData {
        match self {
            Package::Dis(p) => p,
            Package::Hob(p) => p,
            Package::Flwob(p) => p,
            Package::Swt(p) => p.as_ref(),
            Package::Gmg(p) => p,
            Package::Raw(p) => p,
        }
    }

    pub fn data_mut(&mut self) -> &mut dyn PackageData {
        match self {
            Package::Dis(p) => p,
            Package::Hob(p) => p,
            Package::Flwob(p) => p,
            Package::Swt(p) => p.as_mut(),
            Package::Gmg(p) => p,
            Package::Raw(p) => p,
        }
    }

    pub fn ftype(&self) -> &str {
        self.data().ftype()
    }

    pub fn unit(&self) -> i32 {
        self.data().unit()
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Package::Raw(_))
    }
}

impl From<Dis> for Package {
    fn from(p: Dis) -> Self {
        Package::Dis(p)
    }
}

impl From<Hob> for Package {
    fn from(p: Hob) -> Self {
        Package::Hob(p)
    }
}

impl From<Flwob> for Package {
    fn from(p: Flwob) -> Self {
        Package::Flwob(p)
    }
}

impl From<Swt> for Package {
    fn from(p: Swt) -> Self {
        Package::Swt(Box::new(p))
    }
}

impl From<Gmg> for Package {
    fn from(p: Gmg) -> Self {
        Package::Gmg(p)
    }
}

impl From<RawPackage> for Package {
    fn from(p: RawPackage) -> Self {
        Package::Raw(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_reaches_inner_package() {
        let package = Package::from(Gmg::default());
        assert_eq!(package.ftype(), "GMG");
        assert_eq!(package.unit(), 27);
        assert_eq!(package.kind(), PackageKind::Gmg);
        assert!(!package.is_raw());
    }

    #[test]
    fn default_heading_names_ftype() {
        let package = Package::from(Gmg::default());
        assert!(package.data().heading().starts_with("# GMG package"));
    }

    #[test]
    fn set_unit_through_enum() {
        let mut package = Package::from(RawPackage::new("BAS6", 13, "# basic\n"));
        package.data_mut().set_unit(14);
        assert_eq!(package.unit(), 14);
    }
}
