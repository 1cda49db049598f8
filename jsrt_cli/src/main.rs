// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod theme;

use clap::{Parser as ClapParser, Subcommand};
use cliclack::{intro, outro, set_theme};
use jsrt_vm::{ArgList, Engine, Heap, Options, Scope, Value};
use theme::DefaultTheme;

/// A small embeddable JS-like Value/heap/GC/closure core, demoed from
/// the command line.
#[derive(Debug, ClapParser)]
#[command(name = "jsrt")]
#[command(about = "jsrt_vm demo front-end", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Runs the built-in demo programs and prints their output.
    Demo {
        /// Prints `[gc] begin/end` diagnostic lines during every collection.
        #[arg(long)]
        print_internals: bool,

        /// Forces a full collection on every single allocation.
        #[arg(long)]
        force_gc: bool,
    },

    /// Builds a small object graph and prints `Engine::dump()`.
    Dump,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    set_theme(DefaultTheme);
    let args = Cli::parse();

    // Register a signal handler so Ctrl+C during a long demo exits
    // cleanly rather than leaving the terminal in a weird state.
    let _ = ctrlc::set_handler(|| {
        std::process::exit(0);
    });

    match args.command {
        Command::Demo { print_internals, force_gc } => {
            let engine = Engine::with_options(Options { print_internals, force_gc, ..Options::default() });
            intro("jsrt demo")?;
            scenario_round_trip(&engine);
            scenario_simple_gc(&engine);
            scenario_closure_mutation(&engine);
            scenario_return_across_scope(&engine);
            scenario_deep_prototype(&engine);
            scenario_argument_padding(&engine);
            outro("done")?;
        }
        Command::Dump => {
            let engine = Engine::new();
            let scope = Scope::new(&engine);
            let root = engine.root();
            let key = scope.push_local(engine.new_string("greeting"));
            let value = scope.push_local(engine.new_string("hello"));
            engine.set_property(root, key.get(), value.get());
            println!("{}", engine.dump());
        }
    }
    Ok(())
}

#[cfg(feature = "nan-boxing")]
fn make_double(_engine: &Engine, value: f64) -> Value {
    Value::from_double(value)
}
#[cfg(feature = "tagged-pointer")]
fn make_double(engine: &Engine, value: f64) -> Value {
    Value::from_double(engine, value)
}

#[cfg(feature = "nan-boxing")]
fn double_value(_heap: &Heap, value: Value) -> f64 {
    value.as_double()
}
#[cfg(feature = "tagged-pointer")]
fn double_value(heap: &Heap, value: Value) -> f64 {
    value.as_double(heap)
}

/// Scenario 1, *Round-trip*: every predicate agrees with how a Value
/// was constructed, and `asX` recovers exactly what went in.
fn scenario_round_trip(engine: &Engine) {
    println!("\n-- round-trip --");
    let heap = engine.heap();
    let int_v = Value::from_int32(42);
    let double_v = make_double(engine, 3.14);
    let bool_v = Value::from_bool(true);
    let undef_v = Value::UNDEFINED;

    assert!(int_v.is_int32() && int_v.as_int32() == 42);
    assert!(!double_v.is_int32());
    assert!((double_value(heap, double_v) - 3.14).abs() < f64::EPSILON);
    assert!(bool_v.is_bool() && bool_v.as_bool());
    assert!(undef_v.is_undefined());
    println!(
        "int32(42)={}, double(3.14)={}, bool(true)={}, undefined={}",
        int_v.dump(heap),
        double_v.dump(heap),
        bool_v.dump(heap),
        undef_v.dump(heap),
    );
}

/// Scenario 2, *Simple GC*: an Object reachable from the root survives
/// a collection; one that was never rooted does not.
fn scenario_simple_gc(engine: &Engine) {
    println!("\n-- simple GC --");
    let scope = Scope::new(engine);
    let root = engine.root();
    let key_x = scope.push_local(engine.new_string("x"));
    let a = scope.push_local(engine.new_object(None));
    engine.set_property(root, key_x.get(), a.get());
    // `b` is deliberately never pushed onto the shadow stack and never
    // attached to the root, so nothing keeps it alive past this block.
    {
        let _b = engine.new_object(None);
    }
    let before = engine.heap().live_count();
    let stats = engine.gc();
    println!(
        "live before gc: {before}, freed: {}, live after: {}, a survives: {}",
        stats.freed,
        stats.live_after,
        engine.get_property(root, key_x.get()).dump(engine.heap()) != "undefined",
    );
}

fn inner_overwrite_cell(engine: &Engine, callee: Value, _this: Value, _args: &ArgList<'_>) -> Value {
    let cell = engine.captured_cell(callee, 0);
    let scope = Scope::new(engine);
    let replacement = scope.push_local(engine.new_string("b plus one"));
    engine.cell_set(cell, replacement.get());
    Value::UNDEFINED
}

/// Scenario 3, *Closure mutation*: writing through one Function's
/// captured Cell is visible through every other Function sharing it.
fn scenario_closure_mutation(engine: &Engine) {
    println!("\n-- closure mutation --");
    let scope = Scope::new(engine);
    let initial = scope.push_local(engine.new_string("b"));
    let cell = scope.push_local(engine.new_cell(initial.get()));
    let inner =
        scope.push_local(engine.new_function(Some("inner"), 0, vec![cell.get()], inner_overwrite_cell));

    println!("b = {}", engine.cell_get(cell.get()).dump(engine.heap()));
    engine.call(inner.get(), Value::UNDEFINED, &[]);
    println!("b = {}", engine.cell_get(cell.get()).dump(engine.heap()));
}

fn inner_work(engine: &Engine, _callee: Value, _this: Value, _args: &ArgList<'_>) -> Value {
    engine.new_string("work")
}

fn inner_play(engine: &Engine, _callee: Value, _this: Value, _args: &ArgList<'_>) -> Value {
    engine.new_string("play")
}

/// Scenario 4, *Return across scope*: two Strings constructed and
/// escaped from inside a `call` stay alive (as Locals rooted in the
/// caller's Scope) across an intervening `gc()`.
fn scenario_return_across_scope(engine: &Engine) {
    println!("\n-- return across scope --");
    let scope = Scope::new(engine);
    let work_fn = scope.push_local(engine.new_function(Some("work"), 0, vec![], inner_work));
    let play_fn = scope.push_local(engine.new_function(Some("play"), 0, vec![], inner_play));

    let work = engine.call(work_fn.get(), Value::UNDEFINED, &[]);
    let play = engine.call(play_fn.get(), Value::UNDEFINED, &[]);
    let concatenated =
        format!("{}{}", work.get().to_js_string(engine.heap()), play.get().to_js_string(engine.heap()));
    engine.gc();
    println!(
        "work+play = {concatenated:?} (survive gc: work={}, play={})",
        work.dump(),
        play.dump(),
    );
}

/// Scenario 5, *Deep prototype*: a property set on an ancestor is
/// visible through the whole chain, and disappears once that ancestor
/// is unlinked.
fn scenario_deep_prototype(engine: &Engine) {
    println!("\n-- deep prototype --");
    let scope = Scope::new(engine);
    let root = engine.root();
    let key_k = scope.push_local(engine.new_string("k"));
    let a = scope.push_local(engine.new_object(Some(root)));
    let b = scope.push_local(engine.new_object(Some(a.get())));
    let c = scope.push_local(engine.new_object(Some(b.get())));

    engine.set_property(a.get(), key_k.get(), Value::from_int32(7));
    println!("c.k (through a) = {}", engine.get_property(c.get(), key_k.get()).dump(engine.heap()));

    engine.set_prototype(b.get(), Some(root));
    println!("c.k (a unlinked) = {}", engine.get_property(c.get(), key_k.get()).dump(engine.heap()));
}

fn arity_three_body(engine: &Engine, _callee: Value, _this: Value, args: &ArgList<'_>) -> Value {
    assert_eq!(args.len(), 2);
    assert_eq!(args.arity(), 3);
    assert!(args.get(2).is_undefined());
    println!(
        "args[0]={}, args[1]={}, args[2]={}, len={}",
        args.get(0).dump(engine.heap()),
        args.get(1).dump(engine.heap()),
        args.get(2).dump(engine.heap()),
        args.len(),
    );
    Value::UNDEFINED
}

/// Scenario 6, *Argument padding*: calling an arity-3 function with
/// two actuals pads the third to `undefined`, while `ArgList::len`
/// still reports the caller's actual count.
fn scenario_argument_padding(engine: &Engine) {
    println!("\n-- argument padding --");
    let scope = Scope::new(engine);
    let f = scope.push_local(engine.new_function(Some("f"), 3, vec![], arity_three_body));
    let a0 = scope.push_local(engine.new_string("first"));
    let a1 = scope.push_local(engine.new_string("second"));
    engine.call(f.get(), Value::UNDEFINED, &[a0.get(), a1.get()]);
}
