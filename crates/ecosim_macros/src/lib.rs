use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, FnArg, ItemFn, Pat};

/// Time a system (or any function) when the `perf_stats` feature is enabled.
///
/// The body is wrapped with a guard that measures wall time and reports it
/// through `bevy::log::info!` when it is dropped. With the feature disabled
/// the guard is compiled out entirely.
///
/// If the function takes a parameter named `tick` whose type mentions
/// `EcoTick`, the guard also reports every 100th tick regardless of duration,
/// so slow-but-steady passes still show up in the log.
///
/// ```ignore
/// #[profile(2)] // report when slower than 2ms
/// pub fn steer_predators(tick: Res<EcoTick>, /* ... */) { /* ... */ }
/// ```
#[proc_macro_attribute]
pub fn profile(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let threshold_ms: u128 = if attr.is_empty() {
        1
    } else {
        attr.to_string().trim().parse().unwrap_or(1)
    };

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;
    let fn_name_str = sig.ident.to_string();

    let has_tick_param = sig.inputs.iter().any(|arg| {
        let FnArg::Typed(pat_type) = arg else {
            return false;
        };
        let Pat::Ident(pat_ident) = &*pat_type.pat else {
            return false;
        };
        let ty = &pat_type.ty;
        pat_ident.ident == "tick" && quote!(#ty).to_string().contains("EcoTick")
    });

    let guard = if has_tick_param {
        quote! {
            struct PhaseTimer {
                name: &'static str,
                start: std::time::Instant,
                tick: u64,
            }
            impl Drop for PhaseTimer {
                fn drop(&mut self) {
                    let elapsed = self.start.elapsed();
                    if elapsed.as_millis() > #threshold_ms || self.tick % 100 == 0 {
                        bevy::log::info!("[PERF] tick {} {}: {:?}", self.tick, self.name, elapsed);
                    }
                }
            }
            PhaseTimer {
                name: #fn_name_str,
                start: std::time::Instant::now(),
                tick: tick.0,
            }
        }
    } else {
        quote! {
            struct PhaseTimer {
                name: &'static str,
                start: std::time::Instant,
            }
            impl Drop for PhaseTimer {
                fn drop(&mut self) {
                    let elapsed = self.start.elapsed();
                    if elapsed.as_millis() > #threshold_ms {
                        bevy::log::info!("[PERF] {}: {:?}", self.name, elapsed);
                    }
                }
            }
            PhaseTimer {
                name: #fn_name_str,
                start: std::time::Instant::now(),
            }
        }
    };

    let output = quote! {
        #(#attrs)*
        #vis #sig {
            #[cfg(feature = "perf_stats")]
            let _phase_timer = {
                #guard
            };

            #block
        }
    };

    output.into()
}
