//! Host-side native library, registered into an executor before running.
use sorrel_common::Result;
use sorrel_exec::Exec;
use sorrel_icode::{Function, Value};

/// println(a, b, ...) prints each argument in order, then a newline.
/// The call evaluates to Null.
fn fn_println(_f: &Function, args: &[Value], ret: &mut Value) -> Result<()> {
    let mut line = String::new();
    for a in args {
        line.push_str(&a.to_string());
    }
    println!("{}", line);
    *ret = Value::Null;
    Ok(())
}

pub fn register(ex: &mut Exec) {
    ex.register(Function::native("println", fn_println));
}
