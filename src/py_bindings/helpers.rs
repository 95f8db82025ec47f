use std::collections::HashSet;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{
    PyBool, PyDict, PyFloat, PyFrozenSet, PyInt, PyList, PyModule, PySet, PyString, PyTuple,
    PyType,
};
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};

use crate::evaluator::Helpers;
use crate::pretty::{self, PrettyPrinter};

/// `h()`: print the help screen
#[pyclass(frozen, module = "pyplay")]
pub struct HelpScreen {
    text: String,
}

#[pymethods]
impl HelpScreen {
    fn __call__(&self, py: Python<'_>) -> PyResult<()> {
        print(py, &self.text)
    }

    fn __repr__(&self) -> &'static str {
        "Type h() for help."
    }
}

/// `y(obj)`: print a YAML dump of any object
#[pyclass(frozen, module = "pyplay")]
pub struct YamlDump {
    printer: PrettyPrinter,
}

#[pymethods]
impl YamlDump {
    fn __call__(&self, object: &Bound<'_, PyAny>) -> PyResult<()> {
        let document = yaml_document(object)?;
        print(object.py(), &self.printer.render(&document))
    }

    fn __repr__(&self) -> &'static str {
        "y(obj) -- print a YAML dump of obj"
    }
}

/// `config()`: print the active configuration
#[pyclass(frozen, module = "pyplay")]
pub struct ConfigDump {
    document: String,
    printer: PrettyPrinter,
}

#[pymethods]
impl ConfigDump {
    fn __call__(&self, py: Python<'_>) -> PyResult<()> {
        print(py, &self.printer.render(&self.document))
    }

    fn __repr__(&self) -> &'static str {
        "config() -- print the PyPlay configuration"
    }
}

pub(super) fn bind(py: Python<'_>, namespace: &Bound<'_, PyDict>, helpers: &Helpers) -> PyResult<()> {
    let help = HelpScreen {
        text: helpers.help_text.clone(),
    };
    let dump = YamlDump {
        printer: helpers.printer.clone(),
    };
    let config = ConfigDump {
        document: helpers.config_document.clone(),
        printer: helpers.printer.clone(),
    };

    namespace.set_item("h", Py::new(py, help)?)?;
    namespace.set_item("y", Py::new(py, dump)?)?;
    namespace.set_item("config", Py::new(py, config)?)?;
    Ok(())
}

/// Print through Python so output interleaves with `print()` calls
fn print(py: Python<'_>, text: &str) -> PyResult<()> {
    py.import("builtins")?
        .getattr("print")?
        .call1((text.trim_end_matches('\n'),))?;
    Ok(())
}

/// The YAML document `y()` prints for `object`
pub fn yaml_document(object: &Bound<'_, PyAny>) -> PyResult<String> {
    let value = to_yaml_value(object)?;
    pretty::to_document(&value).map_err(|err| PyValueError::new_err(err.to_string()))
}

/// Convert a Python object to a YAML value.
///
/// Scalars, dicts, and sequences map structurally. Plain instances become a
/// mapping of their `__dict__` tagged `!python/object:<module>.<qualname>`.
/// Everything else (functions, classes, modules, ...) is its `repr()`.
pub fn to_yaml_value(object: &Bound<'_, PyAny>) -> PyResult<Value> {
    let mut active = HashSet::new();
    convert(object, &mut active)
}

fn convert(obj: &Bound<'_, PyAny>, active: &mut HashSet<usize>) -> PyResult<Value> {
    if obj.is_none() {
        return Ok(Value::Null);
    }

    // bool before int: bool is a subclass of int
    if obj.is_instance_of::<PyBool>() {
        return Ok(Value::Bool(obj.extract::<bool>()?));
    }

    if obj.is_instance_of::<PyInt>() {
        if let Ok(i) = obj.extract::<i64>() {
            return Ok(Value::from(i));
        }
        if let Ok(u) = obj.extract::<u64>() {
            return Ok(Value::from(u));
        }
        return Ok(Value::String(obj.str()?.to_string()));
    }

    if obj.is_instance_of::<PyFloat>() {
        return Ok(Value::from(obj.extract::<f64>()?));
    }

    if obj.is_instance_of::<PyString>() {
        return Ok(Value::String(obj.extract::<String>()?));
    }

    if !is_sequence(obj) && !obj.is_instance_of::<PyDict>() && !is_plain_instance(obj)? {
        return Ok(Value::String(obj.repr()?.to_string()));
    }

    // Containers: guard against reference cycles
    let id = obj.as_ptr() as usize;
    if !active.insert(id) {
        return Ok(Value::String(format!(
            "<recursive {}>",
            obj.get_type().qualname()?
        )));
    }
    let value = convert_container(obj, active);
    active.remove(&id);
    value
}

fn convert_container(obj: &Bound<'_, PyAny>, active: &mut HashSet<usize>) -> PyResult<Value> {
    if let Ok(dict) = obj.cast::<PyDict>() {
        return Ok(Value::Mapping(convert_mapping(dict, active)?));
    }

    if is_sequence(obj) {
        let mut items = Vec::new();
        for item in obj.try_iter()? {
            items.push(convert(&item?, active)?);
        }
        return Ok(Value::Sequence(items));
    }

    let attrs = obj.getattr("__dict__")?;
    let attrs = attrs.cast::<PyDict>()?;
    let ty = obj.get_type();
    let tag = Tag::new(format!("python/object:{}.{}", ty.module()?, ty.qualname()?));
    Ok(Value::Tagged(Box::new(TaggedValue {
        tag,
        value: Value::Mapping(convert_mapping(attrs, active)?),
    })))
}

fn convert_mapping(dict: &Bound<'_, PyDict>, active: &mut HashSet<usize>) -> PyResult<Mapping> {
    let mut mapping = Mapping::new();
    for (key, value) in dict.iter() {
        mapping.insert(convert(&key, active)?, convert(&value, active)?);
    }
    Ok(mapping)
}

fn is_sequence(obj: &Bound<'_, PyAny>) -> bool {
    obj.is_instance_of::<PyList>()
        || obj.is_instance_of::<PyTuple>()
        || obj.is_instance_of::<PySet>()
        || obj.is_instance_of::<PyFrozenSet>()
}

/// An instance carrying its state in a `__dict__`, as opposed to a class,
/// module, or callable
fn is_plain_instance(obj: &Bound<'_, PyAny>) -> PyResult<bool> {
    if obj.is_instance_of::<PyType>() || obj.is_instance_of::<PyModule>() || obj.is_callable() {
        return Ok(false);
    }
    match obj.getattr("__dict__") {
        Ok(attrs) => Ok(attrs.is_instance_of::<PyDict>()),
        Err(_) => Ok(false),
    }
}
