use derive_more::Display;

///
/// CascadeType
/// Lifecycle operation that may propagate across a relationship.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum CascadeType {
    #[display("persist")]
    Persist,
    #[display("merge")]
    Merge,
    #[display("remove")]
    Remove,
}

///
/// CascadePolicy
///
/// Declared set of operations a relationship propagates.
/// `NONE` propagates nothing; `ALL` propagates every operation.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CascadePolicy {
    persist: bool,
    merge: bool,
    remove: bool,
}

impl CascadePolicy {
    pub const NONE: Self = Self {
        persist: false,
        merge: false,
        remove: false,
    };
    pub const PERSIST: Self = Self::NONE.with(CascadeType::Persist);
    pub const MERGE: Self = Self::NONE.with(CascadeType::Merge);
    pub const REMOVE: Self = Self::NONE.with(CascadeType::Remove);
    pub const ALL: Self = Self {
        persist: true,
        merge: true,
        remove: true,
    };

    /// Return this policy extended with one more operation.
    #[must_use]
    pub const fn with(mut self, op: CascadeType) -> Self {
        match op {
            CascadeType::Persist => self.persist = true,
            CascadeType::Merge => self.merge = true,
            CascadeType::Remove => self.remove = true,
        }
        self
    }

    #[must_use]
    pub const fn includes(&self, op: CascadeType) -> bool {
        match op {
            CascadeType::Persist => self.persist,
            CascadeType::Merge => self.merge,
            CascadeType::Remove => self.remove,
        }
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        !self.persist && !self.merge && !self.remove
    }
}

///
/// RelationSide
///
/// Which end of the relationship holds the foreign key.
/// Drives emission order during cascade resolution.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelationSide {
    /// The owner holds the foreign key to the target (many-to-one, owning one-to-one).
    Owning,
    /// The target holds the foreign key back to the owner (one-to-many, mapped-by).
    Inverse,
}

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cardinality {
    One,
    Many,
}

///
/// RelationModel
/// Relationship descriptor on an owning entity model.
///

#[derive(Clone, Copy, Debug)]
pub struct RelationModel {
    /// Relationship field name on the owner.
    pub field: &'static str,
    /// Type path of the related entity.
    pub target_path: &'static str,
    pub cardinality: Cardinality,
    pub side: RelationSide,
    pub cascade: CascadePolicy,
    /// Foreign-key column, when the backend stores one.
    pub foreign_key: Option<&'static str>,
}

impl RelationModel {
    /// Declare a relationship with no cascade and no foreign-key column.
    #[must_use]
    pub const fn new(
        field: &'static str,
        target_path: &'static str,
        cardinality: Cardinality,
        side: RelationSide,
    ) -> Self {
        Self {
            field,
            target_path,
            cardinality,
            side,
            cascade: CascadePolicy::NONE,
            foreign_key: None,
        }
    }

    #[must_use]
    pub const fn cascade(mut self, cascade: CascadePolicy) -> Self {
        self.cascade = cascade;
        self
    }

    #[must_use]
    pub const fn foreign_key(mut self, column: &'static str) -> Self {
        self.foreign_key = Some(column);
        self
    }

    /// Whether the related object is emitted before its owner for `op`.
    ///
    /// Writes place foreign-key targets first; removes place referrers first.
    #[must_use]
    pub const fn target_first(&self, op: CascadeType) -> bool {
        match (op, self.side) {
            (CascadeType::Persist | CascadeType::Merge, RelationSide::Owning)
            | (CascadeType::Remove, RelationSide::Inverse) => true,
            (CascadeType::Persist | CascadeType::Merge, RelationSide::Inverse)
            | (CascadeType::Remove, RelationSide::Owning) => false,
        }
    }
}
