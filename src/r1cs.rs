//! R1CS loading: CSR matrices and the interned coefficient table
//!
//! The constraint system travels as JSON: instance counts, a hex-encoded
//! canonical serialization of the distinct field coefficients (the
//! "interner"), and the three matrices in compressed sparse row form
//! whose `values` index into that table. The verification predicate
//! consumes only the statement evaluations derived from the matrices, so
//! this module's job is faithful decoding plus the shape validation that
//! makes a malformed file fail loudly before any transcript work starts.

#![forbid(unsafe_code)]

use ark_serialize::CanonicalDeserialize;
use serde::Deserialize;
use std::path::Path;

use crate::F;

#[derive(Debug, thiserror::Error)]
pub enum R1csError {
    #[error("failed to read R1CS file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse R1CS JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("interner is not valid hex: {0}")]
    InternerHex(#[from] hex::FromHexError),
    #[error("interner bytes do not decode to a scalar table: {0}")]
    InternerDecode(#[from] ark_serialize::SerializationError),
    #[error("matrix {matrix}: row offsets must start at 0, end at {nnz}, and be monotone")]
    RowOffsets { matrix: &'static str, nnz: usize },
    #[error("matrix {matrix}: row offset table has {got} entries, expected {expected}")]
    RowOffsetCount {
        matrix: &'static str,
        got: usize,
        expected: usize,
    },
    #[error("matrix {matrix}: column index {index} out of range ({cols} columns)")]
    ColumnOutOfRange {
        matrix: &'static str,
        index: usize,
        cols: usize,
    },
    #[error("matrix {matrix}: coefficient index {index} out of range (table of {table})")]
    CoefficientOutOfRange {
        matrix: &'static str,
        index: usize,
        table: usize,
    },
    #[error("matrix {matrix}: {col_indices} column indices but {values} coefficient indices")]
    EntryCount {
        matrix: &'static str,
        col_indices: usize,
        values: usize,
    },
    #[error("matrices disagree on dimensions: a is {a_rows}x{a_cols}, {matrix} is {rows}x{cols}")]
    DimensionMismatch {
        matrix: &'static str,
        a_rows: usize,
        a_cols: usize,
        rows: usize,
        cols: usize,
    },
    #[error("matrices are {rows}x{cols} but the system declares {constraints} constraints over {witnesses} witnesses")]
    CountMismatch {
        rows: usize,
        cols: usize,
        constraints: usize,
        witnesses: usize,
    },
}

#[derive(Clone, Debug, Deserialize)]
struct SparseMatrixFile {
    num_rows: usize,
    num_cols: usize,
    row_indices: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<usize>,
}

#[derive(Clone, Debug, Deserialize)]
struct R1csFile {
    public_inputs: usize,
    witnesses: usize,
    constraints: usize,
    interner: String,
    a: SparseMatrixFile,
    b: SparseMatrixFile,
    c: SparseMatrixFile,
}

/// CSR matrix with interner indices resolved to scalars.
#[derive(Clone, Debug)]
pub struct SparseMatrix {
    pub num_rows: usize,
    pub num_cols: usize,
    row_offsets: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<F>,
}

impl SparseMatrix {
    fn from_file(
        matrix: &'static str,
        file: SparseMatrixFile,
        table: &[F],
    ) -> Result<Self, R1csError> {
        if file.col_indices.len() != file.values.len() {
            return Err(R1csError::EntryCount {
                matrix,
                col_indices: file.col_indices.len(),
                values: file.values.len(),
            });
        }
        let nnz = file.values.len();
        if file.row_indices.len() != file.num_rows + 1 {
            return Err(R1csError::RowOffsetCount {
                matrix,
                got: file.row_indices.len(),
                expected: file.num_rows + 1,
            });
        }
        let monotone = file.row_indices.windows(2).all(|w| w[0] <= w[1]);
        if file.row_indices.first() != Some(&0) || file.row_indices.last() != Some(&nnz) || !monotone
        {
            return Err(R1csError::RowOffsets { matrix, nnz });
        }
        for &col in &file.col_indices {
            if col >= file.num_cols {
                return Err(R1csError::ColumnOutOfRange {
                    matrix,
                    index: col,
                    cols: file.num_cols,
                });
            }
        }
        let values = file
            .values
            .iter()
            .map(|&idx| {
                table.get(idx).copied().ok_or(R1csError::CoefficientOutOfRange {
                    matrix,
                    index: idx,
                    table: table.len(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            num_rows: file.num_rows,
            num_cols: file.num_cols,
            row_offsets: file.row_indices,
            col_indices: file.col_indices,
            values,
        })
    }

    /// Entries of row `i` as `(column, coefficient)` pairs.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, F)> + '_ {
        let span = self.row_offsets[i]..self.row_offsets[i + 1];
        self.col_indices[span.clone()]
            .iter()
            .copied()
            .zip(self.values[span].iter().copied())
    }

    pub fn num_entries(&self) -> usize {
        self.values.len()
    }
}

/// A loaded, shape-checked constraint system.
#[derive(Clone, Debug)]
pub struct R1cs {
    pub public_inputs: usize,
    pub witnesses: usize,
    pub constraints: usize,
    pub a: SparseMatrix,
    pub b: SparseMatrix,
    pub c: SparseMatrix,
}

impl R1cs {
    pub fn load(path: &Path) -> Result<Self, R1csError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, R1csError> {
        let file: R1csFile = serde_json::from_str(raw)?;
        let table_bytes = hex::decode(&file.interner)?;
        let table = Vec::<F>::deserialize_compressed(table_bytes.as_slice())?;

        let a = SparseMatrix::from_file("a", file.a, &table)?;
        let b = SparseMatrix::from_file("b", file.b, &table)?;
        let c = SparseMatrix::from_file("c", file.c, &table)?;
        for (name, m) in [("b", &b), ("c", &c)] {
            if m.num_rows != a.num_rows || m.num_cols != a.num_cols {
                return Err(R1csError::DimensionMismatch {
                    matrix: name,
                    a_rows: a.num_rows,
                    a_cols: a.num_cols,
                    rows: m.num_rows,
                    cols: m.num_cols,
                });
            }
        }
        if a.num_rows < file.constraints || a.num_cols < file.witnesses {
            return Err(R1csError::CountMismatch {
                rows: a.num_rows,
                cols: a.num_cols,
                constraints: file.constraints,
                witnesses: file.witnesses,
            });
        }

        Ok(Self {
            public_inputs: file.public_inputs,
            witnesses: file.witnesses,
            constraints: file.constraints,
            a,
            b,
            c,
        })
    }

    /// log2 of the constraint count padded to a power of two.
    pub fn padded_log_constraints(&self) -> usize {
        padded_log2(self.constraints)
    }

    /// log2 of the witness count padded to a power of two.
    pub fn padded_log_witnesses(&self) -> usize {
        padded_log2(self.witnesses)
    }
}

fn padded_log2(n: usize) -> usize {
    n.next_power_of_two().trailing_zeros() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_serialize::CanonicalSerialize;
    use serde_json::json;

    fn interner_hex(values: &[u64]) -> String {
        let table: Vec<F> = values.iter().map(|&v| F::from(v)).collect();
        let mut bytes = Vec::new();
        table.serialize_compressed(&mut bytes).unwrap();
        hex::encode(bytes)
    }

    fn square_matrix() -> serde_json::Value {
        // One constraint over two columns: w0 * w0 = w0 with an identity
        // row in each matrix.
        json!({
            "num_rows": 1,
            "num_cols": 2,
            "row_indices": [0, 1],
            "col_indices": [0],
            "values": [0],
        })
    }

    fn base_file() -> serde_json::Value {
        json!({
            "public_inputs": 1,
            "witnesses": 2,
            "constraints": 1,
            "interner": interner_hex(&[1]),
            "a": square_matrix(),
            "b": square_matrix(),
            "c": square_matrix(),
        })
    }

    #[test]
    fn trivial_system_loads() {
        let r1cs = R1cs::from_json(&base_file().to_string()).unwrap();
        assert_eq!(r1cs.constraints, 1);
        assert_eq!(r1cs.a.num_entries(), 1);
        assert_eq!(r1cs.a.row(0).collect::<Vec<_>>(), vec![(0, F::from(1u64))]);
        assert_eq!(r1cs.padded_log_constraints(), 0);
        assert_eq!(r1cs.padded_log_witnesses(), 1);
    }

    #[test]
    fn bad_row_offsets_are_rejected() {
        let mut file = base_file();
        file["a"]["row_indices"] = json!([1, 1]);
        assert!(matches!(
            R1cs::from_json(&file.to_string()).unwrap_err(),
            R1csError::RowOffsets { matrix: "a", .. }
        ));
    }

    #[test]
    fn out_of_range_column_is_rejected() {
        let mut file = base_file();
        file["b"]["col_indices"] = json!([7]);
        assert!(matches!(
            R1cs::from_json(&file.to_string()).unwrap_err(),
            R1csError::ColumnOutOfRange {
                matrix: "b",
                index: 7,
                cols: 2
            }
        ));
    }

    #[test]
    fn out_of_range_coefficient_is_rejected() {
        let mut file = base_file();
        file["c"]["values"] = json!([3]);
        assert!(matches!(
            R1cs::from_json(&file.to_string()).unwrap_err(),
            R1csError::CoefficientOutOfRange {
                matrix: "c",
                index: 3,
                table: 1
            }
        ));
    }

    #[test]
    fn dimension_disagreement_is_rejected() {
        let mut file = base_file();
        file["c"]["num_cols"] = json!(4);
        assert!(matches!(
            R1cs::from_json(&file.to_string()).unwrap_err(),
            R1csError::DimensionMismatch { matrix: "c", .. }
        ));
    }

    #[test]
    fn undersized_matrices_are_rejected() {
        let mut file = base_file();
        file["witnesses"] = json!(10);
        assert!(matches!(
            R1cs::from_json(&file.to_string()).unwrap_err(),
            R1csError::CountMismatch { .. }
        ));
    }

    #[test]
    fn bad_hex_is_rejected() {
        let mut file = base_file();
        file["interner"] = json!("zz");
        assert!(matches!(
            R1cs::from_json(&file.to_string()).unwrap_err(),
            R1csError::InternerHex(_)
        ));
    }
}
