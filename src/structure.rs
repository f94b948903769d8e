//! Structural tags and the compile-time-style property queries over them.
//!
//! Structural guarantees are explicit tags fixed when a container is
//! constructed; expressions compute their own tag once at construction from
//! their operands and cache it. The queries below answer "does this
//! statically satisfy the property" with a conservative default: anything
//! unknown is [`Structure::General`] and has no property.

/// Structural adaptor tag of a matrix, view or matrix expression.
///
/// An adaptor never exposes an operation that would violate its declared
/// guarantee; the enforcement lives in the containers and views, keyed off
/// this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Structure {
    /// No structural guarantee.
    #[default]
    General,
    /// `a(i,j) == a(j,i)`.
    Symmetric,
    /// `a(i,j) == conj(a(j,i))`.
    Hermitian,
    /// Zero above the diagonal.
    Lower,
    /// Zero on and above the diagonal.
    StrictlyLower,
    /// Zero above the diagonal, implicit unit diagonal.
    UniLower,
    /// Zero below the diagonal.
    Upper,
    /// Zero on and below the diagonal.
    StrictlyUpper,
    /// Zero below the diagonal, implicit unit diagonal.
    UniUpper,
    /// Zero off the diagonal.
    Diagonal,
}

impl Structure {
    pub fn is_symmetric(self) -> bool {
        matches!(self, Structure::Symmetric | Structure::Diagonal)
    }

    pub fn is_hermitian(self) -> bool {
        matches!(self, Structure::Hermitian)
    }

    pub fn is_lower(self) -> bool {
        matches!(
            self,
            Structure::Lower | Structure::StrictlyLower | Structure::UniLower | Structure::Diagonal
        )
    }

    pub fn is_strictly_lower(self) -> bool {
        matches!(self, Structure::StrictlyLower)
    }

    pub fn is_uni_lower(self) -> bool {
        matches!(self, Structure::UniLower)
    }

    pub fn is_upper(self) -> bool {
        matches!(
            self,
            Structure::Upper | Structure::StrictlyUpper | Structure::UniUpper | Structure::Diagonal
        )
    }

    pub fn is_strictly_upper(self) -> bool {
        matches!(self, Structure::StrictlyUpper)
    }

    pub fn is_uni_upper(self) -> bool {
        matches!(self, Structure::UniUpper)
    }

    pub fn is_triangular(self) -> bool {
        self.is_lower() || self.is_upper()
    }

    /// Unit diagonal implied, not separately stored (and not writable).
    pub fn is_uni(self) -> bool {
        matches!(self, Structure::UniLower | Structure::UniUpper)
    }

    /// Whether assignments into a container with this tag must be checked.
    pub fn is_restricted(self) -> bool {
        self != Structure::General
    }

    /// Whether element `(i, j)` is freely writable under this tag.
    ///
    /// Symmetric and Hermitian adaptors accept every position (the write is
    /// mirrored); triangular tags reject positions whose value is implied.
    pub fn writable(self, i: usize, j: usize) -> bool {
        match self {
            Structure::General | Structure::Symmetric | Structure::Hermitian => true,
            Structure::Lower => i >= j,
            Structure::StrictlyLower | Structure::UniLower => i > j,
            Structure::Upper => i <= j,
            Structure::StrictlyUpper | Structure::UniUpper => i < j,
            Structure::Diagonal => i == j,
        }
    }

    /// Whether the implied value at a non-writable position `(i, j)` is the
    /// multiplicative unit rather than zero.
    pub fn implies_unit(self, i: usize, j: usize) -> bool {
        self.is_uni() && i == j
    }

    /// Writable row range `[begin, end)` of column `col` under this tag.
    ///
    /// A lower tag clips the start at the diagonal (one past it for the
    /// strict and uni variants); an upper tag clips the end symmetrically.
    /// Mirroring tags clip nothing.
    pub fn column_bounds(self, col: usize, rows: usize) -> (usize, usize) {
        let begin = if self.is_lower() {
            if self.is_uni_lower() || self.is_strictly_lower() {
                col + 1
            } else {
                col
            }
        } else {
            0
        };
        let end = if self.is_upper() {
            if self.is_uni_upper() || self.is_strictly_upper() {
                col
            } else {
                col + 1
            }
        } else {
            rows
        };
        (begin.min(rows), end.min(rows))
    }

    /// Writable column range `[begin, end)` of row `row` under this tag.
    pub fn row_bounds(self, row: usize, cols: usize) -> (usize, usize) {
        let begin = if self.is_upper() {
            if self.is_uni_upper() || self.is_strictly_upper() {
                row + 1
            } else {
                row
            }
        } else {
            0
        };
        let end = if self.is_lower() {
            if self.is_uni_lower() || self.is_strictly_lower() {
                row
            } else {
                row + 1
            }
        } else {
            cols
        };
        (begin.min(cols), end.min(cols))
    }
}

/// Element order of a dense matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageOrder {
    #[default]
    RowMajor,
    ColumnMajor,
}

impl StorageOrder {
    pub fn is_row_major(self) -> bool {
        matches!(self, StorageOrder::RowMajor)
    }

    pub fn is_column_major(self) -> bool {
        matches!(self, StorageOrder::ColumnMajor)
    }
}

/// Density tag of a container or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Density {
    #[default]
    Dense,
    Sparse,
}

impl Density {
    pub fn is_dense(self) -> bool {
        matches!(self, Density::Dense)
    }

    pub fn is_sparse(self) -> bool {
        matches!(self, Density::Sparse)
    }
}
