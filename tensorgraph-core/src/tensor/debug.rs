use crate::tensor::Tensor;
use std::fmt;

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tensor({}x{})", self.rows(), self.columns())?;
        for r in 0..self.rows() {
            let row = &self.data()[r * self.columns()..(r + 1) * self.columns()];
            let cells: Vec<String> = row.iter().map(|v| format!("{:>10.4}", v)).collect();
            writeln!(f, "[{}]", cells.join(", "))?;
        }
        Ok(())
    }
}
