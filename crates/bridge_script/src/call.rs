//! Argument frames for one native call
//!
//! A [`CallFrame`] holds a bound [`Argument`] for the return slot and for each
//! parameter of a method signature, filled from a flat list of script values.
//! Invoking the native function with those addresses is up to the caller.

use crate::argument::Argument;
use crate::error::MarshalError;
use crate::marshal::Marshaller;
use crate::value::ScriptValue;
use bridge_core::MethodSignature;

#[derive(Debug)]
pub struct CallFrame {
    signature: MethodSignature,
    return_value: Argument,
    arguments: Vec<Argument>,
}

impl CallFrame {
    /// Parse a method encoding against the marshaller's registry.
    pub fn parse(encoding: &str, m: &Marshaller) -> Result<Self, MarshalError> {
        let signature = MethodSignature::parse_with(encoding, m.registry())?;
        Self::new(signature, m)
    }

    pub fn new(signature: MethodSignature, m: &Marshaller) -> Result<Self, MarshalError> {
        let mut return_value = Argument::return_value();
        return_value.configure_descriptor(signature.return_type().clone())?;
        return_value.bind()?;
        return_value.set_auto_call(m.settings().use_auto_call && signature.explicit_arguments().is_empty());

        let arguments = signature
            .arguments()
            .iter()
            .map(|ty| {
                let mut arg = Argument::new();
                arg.configure_descriptor(ty.clone())?;
                arg.bind()?;
                Ok(arg)
            })
            .collect::<Result<Vec<_>, MarshalError>>()?;

        tracing::debug!(
            signature = signature.encoding(),
            arguments = arguments.len(),
            "prepared call frame"
        );
        Ok(Self {
            signature,
            return_value,
            arguments,
        })
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub fn return_value(&self) -> &Argument {
        &self.return_value
    }

    pub fn return_value_mut(&mut self) -> &mut Argument {
        &mut self.return_value
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut [Argument] {
        &mut self.arguments
    }

    /// Zero-argument call that may be made without call syntax.
    pub fn is_auto_call(&self) -> bool {
        self.return_value.flags().is_auto_call
    }

    /// Fill every argument from `values`. Every value must be consumed.
    pub fn fill(&mut self, values: &[ScriptValue], m: &Marshaller) -> Result<(), MarshalError> {
        let expected = self.arguments.len();
        let mut consumed = 0;
        for arg in &mut self.arguments {
            if consumed >= values.len() {
                return Err(MarshalError::mismatch(
                    format!("values for {} arguments", expected),
                    format!("{} values", values.len()),
                ));
            }
            consumed += arg.set_from_arguments(&values[consumed..], m)?;
        }
        if consumed < values.len() {
            return Err(MarshalError::mismatch(
                format!("{} values", consumed),
                format!("{} values", values.len()),
            ));
        }
        Ok(())
    }

    /// Addresses of the argument slots, in order, for the native call.
    pub fn addresses(&self) -> Vec<usize> {
        self.arguments.iter().filter_map(Argument::address).collect()
    }

    /// Current script value of every argument.
    pub fn argument_values(&self, m: &Marshaller) -> Result<Vec<ScriptValue>, MarshalError> {
        self.arguments.iter().map(|arg| arg.value(m)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ScriptObject;
    use bridge_core::StructRegistry;

    #[test]
    fn test_frame_spreads_flat_values() {
        let reg = StructRegistry::new();
        reg.register_encoding("{CGPoint=\"x\"d\"y\"d}").unwrap();
        let m = Marshaller::new(&reg);

        let mut frame = CallFrame::parse("v32@0:8{CGPoint}16", &m).unwrap();
        assert_eq!(frame.arguments().len(), 3);
        assert!(frame.return_value().flags().is_return_value);
        assert!(!frame.is_auto_call());

        let values: Vec<ScriptValue> = vec![ScriptValue::Null, "moveTo:".into(), 10.into(), 20.into()];
        frame.fill(&values, &m).unwrap();
        let out = frame.argument_values(&m).unwrap();
        assert_eq!(out[1], ScriptValue::from("moveTo:"));
        assert_eq!(
            out[2],
            ScriptValue::Object(ScriptObject::new().with("x", 10).with("y", 20))
        );
        assert_eq!(frame.addresses().len(), 3);
    }

    #[test]
    fn test_frame_rejects_wrong_value_counts() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        let mut frame = CallFrame::parse("i@:i", &m).unwrap();
        assert!(frame.fill(&[ScriptValue::Null, "f".into()], &m).is_err());
        assert!(frame
            .fill(&[ScriptValue::Null, "f".into(), 1.into(), 2.into()], &m)
            .is_err());
        frame.fill(&[ScriptValue::Null, "f".into(), 1.into()], &m).unwrap();
    }

    #[test]
    fn test_auto_call_for_zero_argument_signatures() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        let frame = CallFrame::parse("d", &m).unwrap();
        assert!(frame.is_auto_call());
        assert!(frame.arguments().is_empty());

        // Getters still carry the receiver and selector slots.
        let getter = CallFrame::parse("d16@0:8", &m).unwrap();
        assert!(getter.is_auto_call());
        assert_eq!(getter.arguments().len(), 2);
        assert!(!CallFrame::parse("v24@0:8i16", &m).unwrap().is_auto_call());
    }
}
