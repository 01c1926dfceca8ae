// stride_replay/src/serde_helpers.rs

pub mod vec3_f64_from_array {
    use nalgebra::Vector3;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(vec: &Vector3<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(vec.iter())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vector3<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let arr: [f64; 3] = Deserialize::deserialize(deserializer)?;
        Ok(Vector3::from(arr))
    }
}

/// A 3x3 matrix written as three row arrays, e.g. `[[1, 0, 0], [0, 1, 0], [0, 0, 1]]`.
pub mod matrix3_from_rows {
    use nalgebra::Matrix3;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(matrix: &Matrix3<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let rows: Vec<[f64; 3]> = matrix
            .row_iter()
            .map(|row| [row[0], row[1], row[2]])
            .collect();
        serializer.collect_seq(rows)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Matrix3<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rows: [[f64; 3]; 3] = Deserialize::deserialize(deserializer)?;
        Ok(Matrix3::from_row_slice(&rows.concat()))
    }
}
