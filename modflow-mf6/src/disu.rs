//! Unstructured discretization (`DISU6`).
//!
//! Connectivity is stored in compressed row form: `IAC[n]` entries of `JA`
//! belong to node `n`, the first being `n` itself. `IHC`, `CL12`, `HWVA` and
//! `ANGLDEGX` run parallel to `JA`.

use crate::array::{ArrayShape, GridArray};
use crate::blocks::{Block, BlockFile};
use crate::dis::{push_array, GridData, GridOptions};
use crate::disv::{cell2d_block, read_cells, read_vertices, vertices_block, Cell2d, Vertex};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disu {
    pub options: GridOptions,
    pub vertical_offset_tolerance: Option<f64>,
    pub nodes: usize,
    pub top: GridArray<f64>,
    pub bot: GridArray<f64>,
    pub area: GridArray<f64>,
    pub idomain: Option<GridArray<i32>>,
    pub iac: GridArray<i32>,
    /// One-based node numbers, as on disk.
    pub ja: GridArray<i32>,
    pub ihc: GridArray<i32>,
    pub cl12: GridArray<f64>,
    pub hwva: GridArray<f64>,
    pub angldegx: Option<GridArray<f64>>,
    pub vertices: Vec<Vertex>,
    pub cells: Vec<Cell2d>,
}

impl Disu {
    pub fn nja(&self) -> usize {
        self.ja.len()
    }

    /// Zero-based neighbours of zero-based `node`, excluding itself. Fails
    /// for a node outside the grid or connectivity that does not fit `JA`.
    pub fn connections(&self, node: usize) -> Result<Vec<usize>> {
        let invalid = |message: String| Error::package("DISU", message);
        let counts = self
            .iac
            .values()
            .get(..=node)
            .ok_or_else(|| invalid(format!("node {} is outside a grid of {} nodes", node + 1, self.nodes)))?;
        let mut start = 0usize;
        let mut count = 0usize;
        for (n, &iac) in counts.iter().enumerate() {
            start += count;
            count = usize::try_from(iac).map_err(|_| invalid(format!("IAC of node {} is {}", n + 1, iac)))?;
        }
        let row = start
            .checked_add(count)
            .and_then(|end| self.ja.values().get(start..end))
            .ok_or_else(|| invalid(format!("connections of node {} run past NJA {}", node + 1, self.nja())))?;
        row.iter()
            .skip(1)
            .map(|&m| {
                usize::try_from(m)
                    .ok()
                    .and_then(|m| m.checked_sub(1))
                    .ok_or_else(|| invalid(format!("node {} connects to node {}", node + 1, m)))
            })
            .collect()
    }

    pub fn from_block_file(file: &BlockFile, workspace: &Path) -> Result<Self> {
        let options = GridOptions::from_block_file(file)?;
        let vertical_offset_tolerance = match file.block("OPTIONS") {
            Some(block) => block.parse_value("VERTICAL_OFFSET_TOLERANCE")?,
            None => None,
        };

        let dimensions = file.require_block("DIMENSIONS")?;
        let nodes: usize = dimensions.require("NODES")?;
        let nja: usize = dimensions.require("NJA")?;
        let nvert: Option<usize> = dimensions.parse_value("NVERT")?;

        let griddata = GridData::new(file, workspace)?;
        let per_node = ArrayShape::flat(nodes);
        let top = griddata.require("TOP", per_node)?;
        let bot = griddata.require("BOT", per_node)?;
        let area = griddata.require("AREA", per_node)?;
        let idomain = griddata.read("IDOMAIN", per_node)?;

        let connections = GridData::in_block(file, "CONNECTIONDATA", workspace)?;
        let per_connection = ArrayShape::flat(nja);

        let (vertices, cells) = match nvert {
            Some(nvert) if nvert > 0 => (
                read_vertices(file.require_block("VERTICES")?, nvert)?,
                read_cells(file.require_block("CELL2D")?, nodes, nvert)?,
            ),
            _ => (Vec::new(), Vec::new()),
        };

        let disu = Self {
            options,
            vertical_offset_tolerance,
            nodes,
            top,
            bot,
            area,
            idomain,
            iac: connections.require("IAC", per_node)?,
            ja: connections.require("JA", per_connection)?,
            ihc: connections.require("IHC", per_connection)?,
            cl12: connections.require("CL12", per_connection)?,
            hwva: connections.require("HWVA", per_connection)?,
            angldegx: connections.read("ANGLDEGX", per_connection)?,
            vertices,
            cells,
        };
        disu.check_connectivity()?;
        Ok(disu)
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

    /// `ΣIAC = NJA`, each row leads with its own node, and every connection
    /// has a reverse.
    pub fn check_connectivity(&self) -> Result<()> {
        let total: i64 = self.iac.values().iter().map(|&n| i64::from(n)).sum();
        if total != self.nja() as i64 {
            return Err(Error::package("DISU", format!("sum of IAC is {} but NJA is {}", total, self.nja())));
        }

        let mut rows = Vec::with_capacity(self.nodes);
        let mut start = 0;
        for (n, &count) in self.iac.values().iter().enumerate() {
            if count < 1 {
                return Err(Error::package("DISU", format!("node {} has IAC {}", n + 1, count)));
            }
            let row = self
                .ja
                .values()
                .get(start..start + count as usize)
                .ok_or_else(|| Error::package("DISU", format!("IAC of node {} runs past NJA", n + 1)))?;
            if row[0] as usize != n + 1 {
                return Err(Error::package(
                    "DISU",
                    format!("connections of node {} start with node {}", n + 1, row[0]),
                ));
            }
            if let Some(&m) = row.iter().find(|&&m| m < 1 || m as usize > self.nodes) {
                return Err(Error::package("DISU", format!("node {} connects to unknown node {}", n + 1, m)));
            }
            rows.push(&row[1..]);
            start += count as usize;
        }

        for (n, row) in rows.iter().enumerate() {
            for &m in row.iter() {
                let back = rows[m as usize - 1];
                if !back.iter().any(|&k| k as usize == n + 1) {
                    return Err(Error::package(
                        "DISU",
                        format!("node {} connects to {} but not the reverse", n + 1, m),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn to_block_file(&self) -> BlockFile {
        let mut file = BlockFile::new();
        let mut options = self.options.to_block();
        if let Some(tolerance) = self.vertical_offset_tolerance {
            options.push_value("VERTICAL_OFFSET_TOLERANCE", tolerance);
        }
        file.push(options);

        let mut dimensions = Block::new("DIMENSIONS");
        dimensions.push_value("NODES", self.nodes);
        dimensions.push_value("NJA", self.nja());
        if !self.vertices.is_empty() {
            dimensions.push_value("NVERT", self.vertices.len());
        }
        file.push(dimensions);

        let mut griddata = Block::new("GRIDDATA");
        push_array(&mut griddata, "top", &self.top);
        push_array(&mut griddata, "bot", &self.bot);
        push_array(&mut griddata, "area", &self.area);
        if let Some(idomain) = &self.idomain {
            push_array(&mut griddata, "idomain", idomain);
        }
        file.push(griddata);

        let mut connections = Block::new("CONNECTIONDATA");
        push_array(&mut connections, "iac", &self.iac);
        push_array(&mut connections, "ja", &self.ja);
        push_array(&mut connections, "ihc", &self.ihc);
        push_array(&mut connections, "cl12", &self.cl12);
        push_array(&mut connections, "hwva", &self.hwva);
        if let Some(angldegx) = &self.angldegx {
            push_array(&mut connections, "angldegx", angldegx);
        }
        file.push(connections);

        if !self.vertices.is_empty() {
            file.push(vertices_block(&self.vertices));
            file.push(cell2d_block(&self.cells));
        }
        file
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_block_file().write(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Three nodes in a row: 1-2-3.
    const DISU: &str = "\
BEGIN options
  VERTICAL_OFFSET_TOLERANCE 0.5
END options

BEGIN dimensions
  NODES 3
  NJA 7
END dimensions

BEGIN griddata
  top
    CONSTANT 10.0
  bot
    CONSTANT 0.0
  area
    CONSTANT 100.0
END griddata

BEGIN connectiondata
  iac
    INTERNAL
    2 3 2
  ja
    INTERNAL
    1 2  2 1 3  3 2
  ihc
    CONSTANT 1
  cl12
    INTERNAL
    0.0 5.0  0.0 5.0 5.0  0.0 5.0
  hwva
    CONSTANT 10.0
END connectiondata
";

    fn parse(text: &str) -> Result<Disu> {
        Disu::from_block_file(&BlockFile::parse(text)?, Path::new("."))
    }

    #[test]
    fn reads_unstructured_grid() {
        let disu = parse(DISU).unwrap();
        assert_eq!(disu.nodes, 3);
        assert_eq!(disu.nja(), 7);
        assert_eq!(disu.vertical_offset_tolerance, Some(0.5));
        assert_eq!(disu.connections(1).unwrap(), vec![0, 2]);
        assert_eq!(disu.connections(2).unwrap(), vec![1]);
        assert!(disu.connections(3).is_err());
        assert!(disu.cells.is_empty());
    }

    #[test]
    fn iac_must_sum_to_nja() {
        let err = parse(&DISU.replace("2 3 2\n", "2 3 1\n")).unwrap_err();
        assert!(err.to_string().contains("sum of IAC is 6 but NJA is 7"));
    }

    #[test]
    fn row_must_start_with_node() {
        let err = parse(&DISU.replace("1 2  2 1 3  3 2", "1 2  1 2 3  3 2")).unwrap_err();
        assert!(err.to_string().contains("connections of node 2 start with node 1"));
    }

    #[test]
    fn connections_must_be_symmetric() {
        let err = parse(&DISU.replace("1 2  2 1 3  3 2", "1 2  2 1 3  3 1")).unwrap_err();
        assert!(err.to_string().contains("not the reverse"));
    }

    #[test]
    fn per_connection_arrays_have_nja_values() {
        let text = DISU.replace("0.0 5.0  0.0 5.0 5.0  0.0 5.0", "0.0 5.0  0.0 5.0 5.0  0.0");
        assert!(parse(&text).is_err());
    }

    #[test]
    fn bad_connectivity_is_error_not_panic() {
        let mut disu = parse(DISU).unwrap();
        disu.ja = GridArray::from_vec(ArrayShape::flat(7), vec![1, 2, 2, 0, 3, 3, -4], "ja").unwrap();
        assert!(disu.connections(1).unwrap_err().to_string().contains("connects to node 0"));
        assert!(disu.connections(2).is_err());

        disu.iac = GridArray::from_vec(ArrayShape::flat(3), vec![-2, 3, 2], "iac").unwrap();
        assert!(disu.connections(1).unwrap_err().to_string().contains("IAC of node 1 is -2"));

        disu.iac = GridArray::from_vec(ArrayShape::flat(3), vec![2, 9, 2], "iac").unwrap();
        assert!(disu.connections(1).unwrap_err().to_string().contains("run past NJA"));
    }

    #[test]
    fn written_grid_reads_back() {
        let disu = parse(DISU).unwrap();
        let again = parse(&disu.to_block_file().to_text()).unwrap();
        assert_eq!(again, disu);
    }
}
