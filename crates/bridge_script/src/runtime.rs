//! Script runtime management
//!
//! Owns a QuickJS runtime and context plus the marshaller scripts talk to.
//! [`ScriptRuntime::install_bridge`] exposes the conversion functions as
//! globals:
//!
//! - `bridgeConvert(encoding, value)` writes `value` into a fresh slot of the
//!   given type and reads it back
//! - `bridgeCall(methodEncoding, ...values)` fills a call frame and returns
//!   the argument values as the native side would see them
//! - `bridgeSizeOf(encoding)` and `bridgeExplain(encoding)`
//! - `bridgeCollect()` drops boxed objects nothing native refers to; script
//!   copies of their wrappers stop converting back

use crate::argument::Argument;
use crate::call::CallFrame;
use crate::error::MarshalError;
use crate::ffi::HandleTable;
use crate::marshal::Marshaller;
use crate::quickjs::{from_js, throw, to_js};
use crate::settings::MarshalSettings;
use crate::value::ScriptValue;
use bridge_core::{parse_with, MethodSignature, StructRegistry};
use rquickjs::function::Rest;
use rquickjs::{Context, Ctx, Function, Runtime, Value};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script engine error: {0}")]
    Engine(#[from] rquickjs::Error),

    #[error("uncaught exception: {0}")]
    Exception(String),

    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error("failed to read script: {0}")]
    Io(#[from] std::io::Error),
}

struct Bridge {
    marshaller: Marshaller<'static>,
    handles: RefCell<HandleTable>,
}

impl Bridge {
    fn to_js<'js>(&self, ctx: &Ctx<'js>, value: &ScriptValue) -> rquickjs::Result<Value<'js>> {
        to_js(ctx, value, &mut self.handles.borrow_mut())
    }

    fn from_js(&self, value: &Value<'_>) -> Result<ScriptValue, MarshalError> {
        from_js(value, &self.handles.borrow())
    }

    fn convert(&self, encoding: &str, value: &ScriptValue) -> Result<ScriptValue, MarshalError> {
        let m = &self.marshaller;
        let mut arg = Argument::new();
        arg.configure(encoding, m.registry())?;
        arg.bind()?;
        arg.set_value(value, m)?;
        arg.value(m)
    }

    fn call(&self, encoding: &str, values: &[ScriptValue]) -> Result<Vec<ScriptValue>, MarshalError> {
        let m = &self.marshaller;
        let mut frame = CallFrame::parse(encoding, m)?;
        frame.fill(values, m)?;
        frame.argument_values(m)
    }

    fn size_of(&self, encoding: &str) -> Result<usize, MarshalError> {
        let ty = parse_with(encoding, self.marshaller.registry())?;
        Ok(self.marshaller.layout().size_of(&ty))
    }

    /// Forget wrappers of objects only the bridge still holds, then drop
    /// unreferenced boxes. Returns how many boxes went away.
    fn collect(&self) -> usize {
        let boxing = self.marshaller.boxing();
        let forgotten = self.handles.borrow_mut().retain_objects(|obj| {
            let bridge_refs = 1 + usize::from(boxing.is_retained(obj.address()));
            obj.strong_count() > bridge_refs
        });
        let collected = boxing.collect();
        tracing::debug!(forgotten, collected, "collected bridge objects");
        collected
    }

    /// Single types first, then method signatures.
    fn explain(&self, encoding: &str) -> Result<String, MarshalError> {
        let registry = self.marshaller.registry();
        match parse_with(encoding, registry) {
            Ok(ty) => Ok(ty.explain()),
            Err(err) => MethodSignature::parse_with(encoding, registry)
                .map(|sig| sig.explain())
                .map_err(|_| err.into()),
        }
    }
}

/// Script execution context
pub struct ScriptRuntime {
    #[allow(dead_code)] // Kept alive for context lifetime
    runtime: Runtime,
    pub context: Context,
    bridge: Rc<Bridge>,
}

impl ScriptRuntime {
    pub fn new() -> Result<Self, ScriptError> {
        Self::with_settings(MarshalSettings::default())
    }

    /// Runtime over the process-wide struct registry.
    pub fn with_settings(settings: MarshalSettings) -> Result<Self, ScriptError> {
        Self::with_marshaller(Marshaller::with_settings(StructRegistry::global(), settings))
    }

    pub fn with_marshaller(marshaller: Marshaller<'static>) -> Result<Self, ScriptError> {
        let runtime = Runtime::new()?;
        let context = Context::full(&runtime)?;

        Ok(Self {
            runtime,
            context,
            bridge: Rc::new(Bridge {
                marshaller,
                handles: RefCell::new(HandleTable::new()),
            }),
        })
    }

    pub fn marshaller(&self) -> &Marshaller<'static> {
        &self.bridge.marshaller
    }

    /// Wrappers currently handed out to scripts.
    pub fn live_handles(&self) -> usize {
        self.bridge.handles.borrow().len()
    }

    /// Forget wrappers of unreferenced objects and drop unreferenced boxes.
    pub fn collect(&self) -> usize {
        self.bridge.collect()
    }

    /// Forget every wrapper handed to scripts. Wrapper objects the script
    /// still holds stop converting back.
    pub fn clear_handles(&self) {
        self.bridge.handles.borrow_mut().clear();
    }

    pub fn execute_file(&self, path: &Path) -> Result<(), ScriptError> {
        let source = std::fs::read_to_string(path)?;
        self.execute(&source)
    }

    pub fn execute(&self, source: &str) -> Result<(), ScriptError> {
        self.context
            .with(|ctx| ctx.eval::<(), _>(source).map_err(|err| caught(&ctx, err)))
    }

    /// Evaluate `source` and convert its completion value.
    pub fn eval(&self, source: &str) -> Result<ScriptValue, ScriptError> {
        self.context.with(|ctx| {
            let value: Value = ctx.eval(source).map_err(|err| caught(&ctx, err))?;
            Ok(self.bridge.from_js(&value)?)
        })
    }

    /// Call a global JavaScript function by name.
    pub fn call_function(&self, name: &str, args: &[ScriptValue]) -> Result<ScriptValue, ScriptError> {
        self.context.with(|ctx| {
            let func: Function = ctx.globals().get(name).map_err(|err| caught(&ctx, err))?;
            let args = args
                .iter()
                .map(|arg| self.bridge.to_js(&ctx, arg))
                .collect::<rquickjs::Result<Vec<_>>>()?;
            let result: Value = func.call((Rest(args),)).map_err(|err| caught(&ctx, err))?;
            Ok(self.bridge.from_js(&result)?)
        })
    }

    /// Fill a call frame for `encoding` from `values`, without a script.
    pub fn call_with_arguments(&self, encoding: &str, values: &[ScriptValue]) -> Result<Vec<ScriptValue>, ScriptError> {
        Ok(self.bridge.call(encoding, values)?)
    }

    /// Install `print`, routed through tracing.
    pub fn install_print(&self) -> Result<(), ScriptError> {
        self.context.with(|ctx| register_print(&ctx))?;
        Ok(())
    }

    pub fn install_bridge(&self) -> Result<(), ScriptError> {
        let bridge = self.bridge.clone();
        self.context.with(|ctx| register_bridge(&ctx, bridge))?;
        tracing::debug!("bridge functions installed");
        Ok(())
    }
}

fn register_bridge<'js>(ctx: &Ctx<'js>, bridge: Rc<Bridge>) -> rquickjs::Result<()> {
    let globals = ctx.globals();

    let state = bridge.clone();
    let convert = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, encoding: String, value: Value<'js>| -> rquickjs::Result<Value<'js>> {
            let output = state
                .from_js(&value)
                .and_then(|input| state.convert(&encoding, &input))
                .map_err(|err| throw(&ctx, &err))?;
            state.to_js(&ctx, &output)
        },
    )?;
    globals.set("bridgeConvert", convert)?;

    let state = bridge.clone();
    let call = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, encoding: String, args: Rest<Value<'js>>| -> rquickjs::Result<Value<'js>> {
            let values = args
                .0
                .iter()
                .map(|arg| state.from_js(arg))
                .collect::<Result<Vec<_>, _>>()
                .and_then(|values| state.call(&encoding, &values))
                .map_err(|err| throw(&ctx, &err))?;
            state.to_js(&ctx, &ScriptValue::Array(values))
        },
    )?;
    globals.set("bridgeCall", call)?;

    let state = bridge.clone();
    let size_of = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, encoding: String| -> rquickjs::Result<f64> {
            let size = state.size_of(&encoding).map_err(|err| throw(&ctx, &err))?;
            Ok(size as f64)
        },
    )?;
    globals.set("bridgeSizeOf", size_of)?;

    let state = bridge.clone();
    let explain = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, encoding: String| -> rquickjs::Result<String> {
            state.explain(&encoding).map_err(|err| throw(&ctx, &err))
        },
    )?;
    globals.set("bridgeExplain", explain)?;

    let state = bridge;
    let collect = Function::new(ctx.clone(), move || -> f64 { state.collect() as f64 })?;
    globals.set("bridgeCollect", collect)?;

    Ok(())
}

fn register_print<'js>(ctx: &Ctx<'js>) -> rquickjs::Result<()> {
    let print = Function::new(
        ctx.clone(),
        |ctx: Ctx<'js>, args: Rest<Value<'js>>| -> rquickjs::Result<()> {
            let mut parts = Vec::with_capacity(args.0.len());
            for arg in args.0 {
                parts.push(render(&ctx, arg)?);
            }
            tracing::info!(target: "script", "{}", parts.join(" "));
            Ok(())
        },
    )?;
    ctx.globals().set("print", print)
}

fn render<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<String> {
    if let Some(s) = value.as_string() {
        return s.to_string();
    }
    match ctx.json_stringify(value)? {
        Some(json) => json.to_string(),
        None => Ok("undefined".to_string()),
    }
}

/// Turn a pending script exception into an error carrying its message.
fn caught(ctx: &Ctx<'_>, err: rquickjs::Error) -> ScriptError {
    if !matches!(err, rquickjs::Error::Exception) {
        return ScriptError::Engine(err);
    }
    let exception = ctx.catch();
    let message = match exception.as_exception() {
        Some(e) => e.message().unwrap_or_default(),
        None => exception
            .as_string()
            .and_then(|s| s.to_string().ok())
            .unwrap_or_else(|| format!("{:?}", exception)),
    };
    ScriptError::Exception(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{NativeHandle, ObjectRef};
    use crate::value::{ScriptObject, Wrapper};

    fn bridged() -> ScriptRuntime {
        let runtime = ScriptRuntime::new().unwrap();
        runtime.install_print().unwrap();
        runtime.install_bridge().unwrap();
        runtime
    }

    #[test]
    fn test_call_function_with_values() {
        let runtime = ScriptRuntime::new().unwrap();
        runtime
            .execute("function area(r) { return { w: r.size[0], total: r.size[0] * r.size[1] }; }")
            .unwrap();
        let rect = ScriptObject::new().with("size", ScriptValue::Array(vec![3.into(), 4.into()]));
        let out = runtime.call_function("area", &[rect.into()]).unwrap();
        assert_eq!(out.get("w"), Some(&ScriptValue::Number(3.0)));
        assert_eq!(out.get("total"), Some(&ScriptValue::Number(12.0)));
    }

    #[test]
    fn test_uncaught_exceptions_carry_message() {
        let runtime = ScriptRuntime::new().unwrap();
        match runtime.execute("throw new Error('boom')") {
            Err(ScriptError::Exception(message)) => assert_eq!(message, "boom"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(runtime.call_function("missing", &[]).is_err());
    }

    #[test]
    fn test_bridge_conversions() {
        let runtime = bridged();
        let ok = runtime
            .eval(
                r#"
                print("checking", 1, { a: [2] });
                [
                    bridgeConvert("C", 999) === 255,
                    bridgeConvert("C", -4) === 0,
                    bridgeConvert("c", "A") === 65,
                    bridgeConvert('{RtPoint="x"d"y"d}', [1, 2]).y === 2,
                    bridgeSizeOf("{RtPair=ci}") === 8,
                    bridgeExplain("c@:@") === "char (id, SEL, id)",
                    bridgeExplain("^i") === "int*",
                ].every(x => x)
                "#,
            )
            .unwrap();
        assert_eq!(ok, ScriptValue::Bool(true));
    }

    #[test]
    fn test_bridge_errors_are_typed() {
        let runtime = bridged();
        let kinds = runtime
            .eval(
                r#"
                const kinds = [];
                try { bridgeConvert("c", 300); } catch (e) { kinds.push(e instanceof RangeError); }
                try { bridgeConvert("i", "text"); } catch (e) { kinds.push(e instanceof TypeError); }
                try { bridgeConvert("{RtMissing}", []); } catch (e) { kinds.push(e.message.startsWith("UnregisteredStruct")); }
                try { bridgeSizeOf("{oops"); } catch (e) { kinds.push(e.message.startsWith("MalformedEncoding")); }
                kinds
                "#,
            )
            .unwrap();
        assert_eq!(kinds, ScriptValue::Array(vec![true.into(); 4]));
    }

    #[test]
    fn test_pointers_roundtrip_through_script() {
        let runtime = bridged();
        let ok = runtime
            .eval(
                r#"
                const p = bridgeConvert("^v", 4096);
                p.__bridge_kind === "pointer" && p.address === 4096 && bridgeConvert("^i", p).address === 4096
                "#,
            )
            .unwrap();
        assert_eq!(ok, ScriptValue::Bool(true));
        assert_eq!(runtime.live_handles(), 2);
        runtime.clear_handles();
        assert_eq!(runtime.live_handles(), 0);
    }

    #[test]
    fn test_oversized_conversions_raise_range_errors() {
        let runtime = bridged();
        let ok = runtime
            .eval(
                r#"
                let caught = false;
                try { bridgeConvert("[100000000000000C]", []); } catch (e) { caught = e instanceof RangeError; }
                caught && bridgeSizeOf("[100000000000000C]") === 100000000000000
                "#,
            )
            .unwrap();
        assert_eq!(ok, ScriptValue::Bool(true));
    }

    struct Window;

    impl NativeHandle for Window {
        fn class_name(&self) -> &str {
            "NSWindow"
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn test_repeated_conversions_share_one_handle() {
        let runtime = bridged();
        runtime
            .execute(
                r#"
                function keep(w) {
                    for (let i = 0; i < 50; i++) { w = bridgeConvert("@", w); }
                    return w.className;
                }
                "#,
            )
            .unwrap();
        let window = ObjectRef::from_handle(Window);
        let name = runtime
            .call_function("keep", &[ScriptValue::Wrapper(Wrapper::Object(window.clone()))])
            .unwrap();
        assert_eq!(name, ScriptValue::from("NSWindow"));
        assert_eq!(runtime.live_handles(), 1);

        // Still held natively, so nothing is collected.
        assert_eq!(runtime.eval("bridgeCollect()").unwrap(), ScriptValue::Number(0.0));
        assert_eq!(runtime.live_handles(), 1);

        drop(window);
        assert_eq!(runtime.eval("bridgeCollect()").unwrap(), ScriptValue::Number(1.0));
        assert_eq!(runtime.live_handles(), 0);
        assert_eq!(runtime.marshaller().boxing().retained_count(), 0);
    }

    #[test]
    fn test_bridge_call_spreads_struct_values() {
        let runtime = bridged();
        let out = runtime
            .eval(r#"bridgeCall('v@:{RtPoint="x"d"y"d}i', null, "moveBy:", 3, 4, 7)"#)
            .unwrap();
        let items = out.as_array().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], ScriptValue::Null);
        assert_eq!(items[1], ScriptValue::from("moveBy:"));
        assert_eq!(items[2], ScriptObject::new().with("x", 3).with("y", 4).into());
        assert_eq!(items[3], ScriptValue::Number(7.0));
    }

    #[test]
    fn test_call_with_arguments_outside_script() {
        let runtime = ScriptRuntime::new().unwrap();
        let out = runtime
            .call_with_arguments("v@:Cd", &[ScriptValue::Null, "tick".into(), 300.into(), 0.5.into()])
            .unwrap();
        assert_eq!(out[2], ScriptValue::Number(255.0));
        assert_eq!(out[3], ScriptValue::Number(0.5));
        assert!(matches!(
            runtime.call_with_arguments("v@:C", &[ScriptValue::Null]),
            Err(ScriptError::Marshal(MarshalError::TypeMismatch { .. }))
        ));
    }
}
