//! Mesh files.
//!
//! A decomposed mesh is stored as one file per rank, spread round robin over
//! [NUM_MESH_FOLDERS] folders. Files are VTK unstructured grids.

use std::path::{Path, PathBuf};

use vtkio::model::{DataSet, Vtk};

use crate::{
    constants::NUM_MESH_FOLDERS,
    dataset::MeshData,
    error::{Error, Result},
    geometry::{BoundingBox, Point},
    types::DataType,
};

/// Path of the mesh file of `rank` in a decomposition into `size` parts.
///
/// The file is `<base>_<folder>/<name>.<part>` with folder `rank % 4 + 1` and
/// part `rank % size`, zero padded to the number of digits of `size`.
pub fn mesh_path_for_rank(base: &str, name: &str, rank: usize, size: usize) -> Result<PathBuf> {
    let width = match size {
        0 => return Err(Error::Mesh("decomposition size must be positive".to_string())),
        1..=9 => 1,
        10..=99 => 2,
        100..=999 => 3,
        1000..=9999 => 4,
        _ => {
            return Err(Error::Mesh(format!(
                "maxed out number of ranks for mesh file names: {size}"
            )))
        }
    };

    let folder = (rank % NUM_MESH_FOLDERS) + 1;
    let part = rank % size;
    Ok(PathBuf::from(format!(
        "{base}_{folder}/{name}.{part:0width$}"
    )))
}

/// Split legacy VTK connectivity `[n, v_1, .., v_n, n, ..]` into cells.
fn legacy_cells(verts: &[u32]) -> Result<Vec<Vec<usize>>> {
    let mut cells = Vec::new();
    let mut index = 0;
    while index < verts.len() {
        let count = verts[index] as usize;
        let cell = verts
            .get(index + 1..index + 1 + count)
            .ok_or_else(|| Error::Mesh("truncated cell connectivity".to_string()))?;
        cells.push(cell.iter().map(|&v| v as usize).collect());
        index += 1 + count;
    }
    Ok(cells)
}

fn cell_points<'a>(nodes: &'a [Point], cell: &[usize]) -> Result<Vec<&'a Point>> {
    cell.iter()
        .map(|&id| {
            nodes
                .get(id)
                .ok_or_else(|| Error::Mesh(format!("cell refers to missing node {id}")))
        })
        .collect()
}

/// Load the data of one rank from a VTK file.
///
/// Points are the mesh nodes. Boxes are the bounding boxes of the cells, with
/// the node ids of every cell; with `count_nodes` coverage is relative to the
/// node count instead of the cell count. Triangles are the cells with three nodes.
pub fn load_vtk(path: &Path, data_type: DataType, count_nodes: bool) -> Result<MeshData> {
    let mut vtk = Vtk::import(path)
        .map_err(|e| Error::Mesh(format!("{}: {:?}", path.display(), e)))?;
    vtk.load_all_pieces()
        .map_err(|e| Error::Mesh(format!("{}: {:?}", path.display(), e)))?;

    let DataSet::UnstructuredGrid { pieces, .. } = vtk.data else {
        return Err(Error::Mesh(format!(
            "{}: not an unstructured grid",
            path.display()
        )));
    };

    let mut nodes = Vec::new();
    let mut cells = Vec::new();
    for piece in &pieces {
        let data = piece
            .load_piece_data(None)
            .map_err(|e| Error::Mesh(format!("{}: {:?}", path.display(), e)))?;

        let coords: Vec<f64> = data
            .points
            .into_vec()
            .ok_or_else(|| Error::Mesh("points are not stored as floats".to_string()))?;
        let coords: &[[f64; 3]] = bytemuck::try_cast_slice(&coords)
            .map_err(|_| Error::Mesh(format!("{} coordinates is not a multiple of 3", coords.len())))?;

        // Cell node ids are local to their piece.
        let first_node = nodes.len();
        nodes.extend(coords.iter().map(|&c| Point::new(c)));

        let (_, verts) = data.cells.cell_verts.into_legacy();
        for cell in legacy_cells(&verts)? {
            cells.push(cell.into_iter().map(|id| id + first_node).collect::<Vec<_>>());
        }
    }

    tracing::info!(
        path = %path.display(),
        nodes = nodes.len(),
        cells = cells.len(),
        "loaded mesh"
    );

    match data_type {
        DataType::Points => {
            let count = nodes.len();
            MeshData::from_points(nodes, count)
        }
        DataType::Boxes => {
            let mut points = Vec::with_capacity(2 * cells.len());
            for cell in &cells {
                let members: Vec<Point> = cell_points(&nodes, cell)?.into_iter().copied().collect();
                let bbox = BoundingBox::from_points(&members)
                    .ok_or_else(|| Error::Mesh("cell without nodes".to_string()))?;
                points.push(Point::new(bbox.lower()));
                points.push(Point::new(bbox.upper()));
            }
            let num_data_pts = if count_nodes { nodes.len() } else { cells.len() };
            let mut data = MeshData::from_points(points, num_data_pts)?;
            data.node_ids = Some(cells);
            Ok(data)
        }
        DataType::Triangles => {
            let mut points = Vec::new();
            for cell in cells.iter().filter(|cell| cell.len() == 3) {
                points.extend(cell_points(&nodes, cell)?.into_iter().copied());
            }
            let count = points.len() / 3;
            MeshData::from_points(points, count)
        }
    }
}
