/// How a new id is minted for each kind of entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    /// Time-sortable, used for records.
    Ulid,
    /// Databases, fields and views.
    Uuid,
    /// Short ids for select options.
    Nanoid,
}

pub fn generate(strategy: IdStrategy) -> String {
    match strategy {
        IdStrategy::Ulid => ulid::Ulid::new().to_string().to_lowercase(),
        IdStrategy::Uuid => uuid::Uuid::new_v4().to_string(),
        IdStrategy::Nanoid => nanoid::nanoid!(10),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_shapes() {
        assert_eq!(generate(IdStrategy::Ulid).len(), 26);
        assert_eq!(generate(IdStrategy::Uuid).len(), 36);
        assert_eq!(generate(IdStrategy::Nanoid).len(), 10);
        assert_ne!(generate(IdStrategy::Uuid), generate(IdStrategy::Uuid));
    }
}
