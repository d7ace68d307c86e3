//! Structured discretization (`DIS6`) and the options all three
//! discretization packages share.

use crate::array::{ArrayShape, GridArray, RecordCursor};
use crate::blocks::{Block, BlockFile};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// OPTIONS common to DIS, DISV and DISU.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridOptions {
    pub length_units: Option<String>,
    pub nogrb: bool,
    pub xorigin: Option<f64>,
    pub yorigin: Option<f64>,
    pub angrot: Option<f64>,
}

impl GridOptions {
    pub fn from_block_file(file: &BlockFile) -> Result<Self> {
        let Some(options) = file.block("OPTIONS") else {
            return Ok(Self::default());
        };
        Ok(Self {
            length_units: options.value("LENGTH_UNITS").map(str::to_string),
            nogrb: options.has("NOGRB"),
            xorigin: options.parse_value("XORIGIN")?,
            yorigin: options.parse_value("YORIGIN")?,
            angrot: options.parse_value("ANGROT")?,
        })
    }

    /// The OPTIONS block, extended by the caller with package-specific
    /// keywords.
    pub fn to_block(&self) -> Block {
        let mut block = Block::new("OPTIONS");
        if let Some(units) = &self.length_units {
            block.push_value("LENGTH_UNITS", units);
        }
        if self.nogrb {
            block.push_keyword("NOGRB");
        }
        for (keyword, value) in [
            ("XORIGIN", self.xorigin),
            ("YORIGIN", self.yorigin),
            ("ANGROT", self.angrot),
        ] {
            if let Some(value) = value {
                block.push_value(keyword, value);
            }
        }
        block
    }
}

/// Named arrays of a GRIDDATA (or CONNECTIONDATA) block.
pub(crate) struct GridData<'a> {
    block: &'a Block,
    workspace: &'a Path,
}

impl<'a> GridData<'a> {
    pub(crate) fn new(file: &'a BlockFile, workspace: &'a Path) -> Result<Self> {
        Self::in_block(file, "GRIDDATA", workspace)
    }

    pub(crate) fn in_block(file: &'a BlockFile, block: &str, workspace: &'a Path) -> Result<Self> {
        Ok(Self {
            block: file.require_block(block)?,
            workspace,
        })
    }

    /// Read array `name` if present. Arrays may appear in any order.
    pub(crate) fn read<T: modflow_core::ArrayValue>(&self, name: &str, shape: ArrayShape) -> Result<Option<GridArray<T>>> {
        let Some(start) = self
            .block
            .records
            .iter()
            .position(|r| is_header(r, name))
        else {
            return Ok(None);
        };
        let mut cursor = RecordCursor::new(&self.block.records[start + 1..]);
        let header = &self.block.records[start];
        tracing::debug!(array = name, values = shape.len(), "reading grid array");
        GridArray::read(header, &mut cursor, shape, self.workspace).map(Some)
    }

    pub(crate) fn require<T: modflow_core::ArrayValue>(&self, name: &str, shape: ArrayShape) -> Result<GridArray<T>> {
        self.read(name, shape)?
            .ok_or_else(|| Error::missing_keyword(&self.block.name, name))
    }
}

fn is_header(record: &[String], name: &str) -> bool {
    match record {
        [first] => first.eq_ignore_ascii_case(name),
        [first, second] => first.eq_ignore_ascii_case(name) && second.eq_ignore_ascii_case("LAYERED"),
        _ => false,
    }
}

pub(crate) fn push_array<T: modflow_core::ArrayValue>(block: &mut Block, name: &str, array: &GridArray<T>) {
    block.records.extend(array.to_records(name));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dis {
    pub options: GridOptions,
    pub nlay: usize,
    pub nrow: usize,
    pub ncol: usize,
    pub delr: GridArray<f64>,
    pub delc: GridArray<f64>,
    pub top: GridArray<f64>,
    pub botm: GridArray<f64>,
    pub idomain: Option<GridArray<i32>>,
}

impl Dis {
    /// A uniform grid with unit cell sizes.
    pub fn new(nlay: usize, nrow: usize, ncol: usize, top: f64, botm: &[f64]) -> Result<Self> {
        if botm.len() != nlay {
            return Err(Error::package("DIS", format!("{} layer bottoms for {} layers", botm.len(), nlay)));
        }
        let ncpl = nrow * ncol;
        let botm = botm
            .iter()
            .flat_map(|&b| std::iter::repeat(b).take(ncpl))
            .collect();
        Ok(Self {
            options: GridOptions::default(),
            nlay,
            nrow,
            ncol,
            delr: GridArray::constant(ArrayShape::flat(ncol), 1.0),
            delc: GridArray::constant(ArrayShape::flat(nrow), 1.0),
            top: GridArray::constant(ArrayShape::flat(ncpl), top),
            botm: GridArray::from_vec(ArrayShape::new(nlay, ncpl), botm, "botm")?.with_layered(true),
            idomain: None,
        })
    }

    pub fn ncpl(&self) -> usize {
        self.nrow * self.ncol
    }

    pub fn nodes(&self) -> usize {
        self.nlay * self.ncpl()
    }

    pub fn from_block_file(file: &BlockFile, workspace: &Path) -> Result<Self> {
        let options = GridOptions::from_block_file(file)?;
        let dimensions = file.require_block("DIMENSIONS")?;
        let nlay: usize = dimensions.require("NLAY")?;
        let nrow: usize = dimensions.require("NROW")?;
        let ncol: usize = dimensions.require("NCOL")?;
        let ncpl = nrow * ncol;

        let griddata = GridData::new(file, workspace)?;
        let layers = ArrayShape::new(nlay, ncpl);
        Ok(Self {
            options,
            nlay,
            nrow,
            ncol,
            delr: griddata.require("DELR", ArrayShape::flat(ncol))?,
            delc: griddata.require("DELC", ArrayShape::flat(nrow))?,
            top: griddata.require("TOP", ArrayShape::flat(ncpl))?,
            botm: griddata.require("BOTM", layers)?,
            idomain: griddata.read("IDOMAIN", layers)?,
        })
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = BlockFile::read(path)?;
        let workspace = path.parent().unwrap_or(Path::new("."));
        Self::from_block_file(&file, workspace).map_err(|source| Error::Load {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    pub fn to_block_file(&self) -> BlockFile {
        let mut file = BlockFile::new();
        file.push(self.options.to_block());

        let mut dimensions = Block::new("DIMENSIONS");
        dimensions.push_value("NLAY", self.nlay);
        dimensions.push_value("NROW", self.nrow);
        dimensions.push_value("NCOL", self.ncol);
        file.push(dimensions);

        let mut griddata = Block::new("GRIDDATA");
        push_array(&mut griddata, "delr", &self.delr);
        push_array(&mut griddata, "delc", &self.delc);
        push_array(&mut griddata, "top", &self.top);
        push_array(&mut griddata, "botm", &self.botm);
        if let Some(idomain) = &self.idomain {
            push_array(&mut griddata, "idomain", idomain);
        }
        file.push(griddata);
        file
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_block_file().write(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIS: &str = "\
BEGIN options
  LENGTH_UNITS meters
  XORIGIN 100.0
END options

BEGIN dimensions
  NLAY 2
  NROW 2
  NCOL 3
END dimensions

BEGIN griddata
  delr
    CONSTANT 10.0
  delc
    INTERNAL
    5.0 15.0
  top
    CONSTANT 0.0
  botm LAYERED
    CONSTANT -10.0
    CONSTANT -20.0
  idomain
    INTERNAL
    1 1 1 1 1 0
    1 1 1 1 1 1
END griddata
";

    #[test]
    fn reads_structured_grid() {
        let dis = Dis::from_block_file(&BlockFile::parse(DIS).unwrap(), Path::new(".")).unwrap();
        assert_eq!(dis.options.length_units.as_deref(), Some("meters"));
        assert_eq!(dis.options.xorigin, Some(100.0));
        assert_eq!(dis.nodes(), 12);
        assert_eq!(dis.delc.values(), &[5.0, 15.0]);
        assert_eq!(dis.botm.layer(1), Some(&[-20.0; 6][..]));
        assert_eq!(dis.idomain.as_ref().unwrap().get(5), Some(0));
    }

    #[test]
    fn arrays_found_in_any_order() {
        let text = DIS.replace("  delr\n    CONSTANT 10.0\n", "").replace(
            "END griddata",
            "  delr\n    CONSTANT 10.0\nEND griddata",
        );
        let dis = Dis::from_block_file(&BlockFile::parse(&text).unwrap(), Path::new(".")).unwrap();
        assert_eq!(dis.delr.values(), &[10.0; 3]);
    }

    #[test]
    fn missing_top_is_error() {
        let text = DIS.replace("  top\n    CONSTANT 0.0\n", "");
        let err = Dis::from_block_file(&BlockFile::parse(&text).unwrap(), Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::MissingKeyword { .. }));
    }

    #[test]
    fn written_grid_reads_back() {
        let dis = Dis::from_block_file(&BlockFile::parse(DIS).unwrap(), Path::new(".")).unwrap();
        let text = dis.to_block_file().to_text();
        let again = Dis::from_block_file(&BlockFile::parse(&text).unwrap(), Path::new(".")).unwrap();
        assert_eq!(again, dis);
    }

    #[test]
    fn uniform_grid() {
        let dis = Dis::new(2, 1, 2, 10.0, &[0.0, -5.0]).unwrap();
        assert_eq!(dis.botm.values(), &[0.0, 0.0, -5.0, -5.0]);
        assert!(Dis::new(2, 1, 2, 10.0, &[0.0]).is_err());
    }
}
