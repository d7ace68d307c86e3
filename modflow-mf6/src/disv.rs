//! Vertex discretization (`DISV6`): layers of arbitrary polygons.

use crate::array::{ArrayShape, GridArray};
use crate::blocks::{Block, BlockFile};
use crate::dis::{push_array, GridData, GridOptions};
use crate::error::{Error, Result};
use modflow_core::format::fortran_general;
use modflow_core::parse_field;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

/// A cell polygon. `icvert` holds zero-based vertex indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell2d {
    pub xc: f64,
    pub yc: f64,
    pub icvert: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disv {
    pub options: GridOptions,
    pub nlay: usize,
    pub top: GridArray<f64>,
    pub botm: GridArray<f64>,
    pub idomain: Option<GridArray<i32>>,
    pub vertices: Vec<Vertex>,
    pub cells: Vec<Cell2d>,
}

impl Disv {
    pub fn ncpl(&self) -> usize {
        self.cells.len()
    }

    pub fn nvert(&self) -> usize {
        self.vertices.len()
    }

    pub fn nodes(&self) -> usize {
        self.nlay * self.ncpl()
    }

    pub fn from_block_file(file: &BlockFile, workspace: &Path) -> Result<Self> {
        let options = GridOptions::from_block_file(file)?;
        let dimensions = file.require_block("DIMENSIONS")?;
        let nlay: usize = dimensions.require("NLAY")?;
        let ncpl: usize = dimensions.require("NCPL")?;
        let nvert: usize = dimensions.require("NVERT")?;

        let griddata = GridData::new(file, workspace)?;
        let top = griddata.require("TOP", ArrayShape::flat(ncpl))?;
        let botm = griddata.require("BOTM", ArrayShape::new(nlay, ncpl))?;
        let idomain = griddata.read("IDOMAIN", ArrayShape::new(nlay, ncpl))?;

        let vertices = read_vertices(file.require_block("VERTICES")?, nvert)?;
        let cells = read_cells(file.require_block("CELL2D")?, ncpl, nvert)?;

        Ok(Self {
            options,
            nlay,
            top,
            botm,
            idomain,
            vertices,
            cells,
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
        dimensions.push_value("NCPL", self.ncpl());
        dimensions.push_value("NVERT", self.nvert());
        file.push(dimensions);

        let mut griddata = Block::new("GRIDDATA");
        push_array(&mut griddata, "top", &self.top);
        push_array(&mut griddata, "botm", &self.botm);
        if let Some(idomain) = &self.idomain {
            push_array(&mut griddata, "idomain", idomain);
        }
        file.push(griddata);
        file.push(vertices_block(&self.vertices));
        file.push(cell2d_block(&self.cells));
        file
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_block_file().write(path)
    }
}

/// `iv x y` rows, numbered 1..=nvert in order.
pub(crate) fn read_vertices(block: &Block, nvert: usize) -> Result<Vec<Vertex>> {
    if block.records.len() != nvert {
        return Err(Error::package(
            "VERTICES",
            format!("NVERT is {} but {} vertices are listed", nvert, block.records.len()),
        ));
    }
    block
        .records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let [iv, x, y, ..] = record.as_slice() else {
                return Err(Error::package("VERTICES", format!("incomplete record {:?}", record)));
            };
            let iv: usize = parse_field(iv, "IV")?;
            if iv != i + 1 {
                return Err(Error::package("VERTICES", format!("vertex {} listed in position {}", iv, i + 1)));
            }
            Ok(Vertex {
                x: parse_field(x, "XV")?,
                y: parse_field(y, "YV")?,
            })
        })
        .collect()
}

/// `icell xc yc ncvert icvert...` rows.
pub(crate) fn read_cells(block: &Block, ncell: usize, nvert: usize) -> Result<Vec<Cell2d>> {
    if block.records.len() != ncell {
        return Err(Error::package(
            "CELL2D",
            format!("expected {} cells, found {}", ncell, block.records.len()),
        ));
    }
    block
        .records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let [icell, xc, yc, ncvert, icvert @ ..] = record.as_slice() else {
                return Err(Error::package("CELL2D", format!("incomplete record {:?}", record)));
            };
            let icell: usize = parse_field(icell, "ICELL2D")?;
            if icell != i + 1 {
                return Err(Error::package("CELL2D", format!("cell {} listed in position {}", icell, i + 1)));
            }
            let ncvert: usize = parse_field(ncvert, "NCVERT")?;
            if icvert.len() < ncvert {
                return Err(Error::package(
                    "CELL2D",
                    format!("cell {} lists {} of {} vertices", icell, icvert.len(), ncvert),
                ));
            }
            let icvert = icvert[..ncvert]
                .iter()
                .map(|token| {
                    let iv: usize = parse_field(token, "ICVERT")?;
                    if iv == 0 || iv > nvert {
                        return Err(Error::package(
                            "CELL2D",
                            format!("cell {} references vertex {} outside 1..={}", icell, iv, nvert),
                        ));
                    }
                    Ok(iv - 1)
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Cell2d {
                xc: parse_field(xc, "XC")?,
                yc: parse_field(yc, "YC")?,
                icvert,
            })
        })
        .collect()
}

pub(crate) fn vertices_block(vertices: &[Vertex]) -> Block {
    let mut block = Block::new("VERTICES");
    for (i, v) in vertices.iter().enumerate() {
        block.push_record([(i + 1).to_string(), fortran_general(v.x), fortran_general(v.y)]);
    }
    block
}

pub(crate) fn cell2d_block(cells: &[Cell2d]) -> Block {
    let mut block = Block::new("CELL2D");
    for (i, cell) in cells.iter().enumerate() {
        let mut record = vec![
            (i + 1).to_string(),
            fortran_general(cell.xc),
            fortran_general(cell.yc),
            cell.icvert.len().to_string(),
        ];
        record.extend(cell.icvert.iter().map(|iv| (iv + 1).to_string()));
        block.records.push(record);
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two triangles sharing an edge of a unit square.
    const DISV: &str = "\
BEGIN options
  LENGTH_UNITS meters
END options

BEGIN dimensions
  NLAY 2
  NCPL 2
  NVERT 4
END dimensions

BEGIN griddata
  top
    CONSTANT 1.0
  botm LAYERED
    CONSTANT 0.0
    INTERNAL
    -1.0 -2.0
END griddata

BEGIN vertices
  1 0.0 0.0
  2 1.0 0.0
  3 1.0 1.0
  4 0.0 1.0
END vertices

BEGIN cell2d
  1 0.667 0.333 3 1 2 3
  2 0.333 0.667 3 1 3 4
END cell2d
";

    fn parse(text: &str) -> Result<Disv> {
        Disv::from_block_file(&BlockFile::parse(text)?, Path::new("."))
    }

    #[test]
    fn reads_vertex_grid() {
        let disv = parse(DISV).unwrap();
        assert_eq!(disv.nodes(), 4);
        assert_eq!(disv.nvert(), 4);
        assert_eq!(disv.vertices[2], Vertex { x: 1.0, y: 1.0 });
        assert_eq!(disv.cells[1].icvert, vec![0, 2, 3]);
        assert_eq!(disv.botm.layer(1), Some(&[-1.0, -2.0][..]));
        assert!(disv.idomain.is_none());
    }

    #[test]
    fn vertex_index_out_of_range() {
        let err = parse(&DISV.replace("3 1 3 4", "3 1 3 5")).unwrap_err();
        assert!(err.to_string().contains("vertex 5 outside 1..=4"));
    }

    #[test]
    fn vertex_count_must_match() {
        let err = parse(&DISV.replace("NVERT 4", "NVERT 5")).unwrap_err();
        assert!(err.to_string().contains("NVERT is 5"));
    }

    #[test]
    fn cell_count_must_match() {
        assert!(parse(&DISV.replace("NCPL 2", "NCPL 3")).is_err());
    }

    #[test]
    fn missing_cell2d_block() {
        let text = DISV.split("BEGIN cell2d").next().unwrap();
        assert!(matches!(parse(text), Err(Error::MissingBlock(name)) if name == "CELL2D"));
    }

    #[test]
    fn written_grid_reads_back() {
        let disv = parse(DISV).unwrap();
        let again = parse(&disv.to_block_file().to_text()).unwrap();
        assert_eq!(again, disv);
    }
}
