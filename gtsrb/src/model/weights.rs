use crate::common::*;

/// A deep copy of the variables of a variable store.
#[derive(Debug)]
pub struct WeightSnapshot {
    tensors: HashMap<String, Tensor>,
}

impl WeightSnapshot {
    pub fn capture(vs: &nn::VarStore) -> Self {
        let tensors = tch::no_grad(|| {
            vs.variables()
                .into_iter()
                .map(|(name, tensor)| (name, tensor.detach().copy()))
                .collect()
        });
        Self { tensors }
    }

    /// Copy the captured values back into the variables in place.
    pub fn restore(&self, vs: &nn::VarStore) -> Result<()> {
        tch::no_grad(|| -> Result<()> {
            for (name, mut var) in vs.variables() {
                let saved = self
                    .tensors
                    .get(&name)
                    .ok_or_else(|| format_err!("variable '{}' is missing in the snapshot", name))?;
                var.copy_(saved);
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_restores_values() -> Result<()> {
        let vs = nn::VarStore::new(Device::Cpu);
        let mut weight = vs.root().var("weight", &[3], nn::Init::Const(1.0));
        let snapshot = WeightSnapshot::capture(&vs);

        tch::no_grad(|| {
            let _ = weight.fill_(5.0);
        });
        approx::assert_abs_diff_eq!(f64::from(&weight.sum(Kind::Float)), 15.0);

        snapshot.restore(&vs)?;
        approx::assert_abs_diff_eq!(f64::from(&weight.sum(Kind::Float)), 3.0);
        Ok(())
    }
}
