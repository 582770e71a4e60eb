//! Custom code files as the code generator lays them out.

pub const ACTION_PATH: &str = "lib/custom_code/actions/my_action.dart";
pub const WIDGET_PATH: &str = "lib/custom_code/widgets/my_widget.dart";
pub const FUNCTIONS_PATH: &str = "lib/flutter_flow/custom_functions.dart";
pub const ACTIONS_INDEX_PATH: &str = "lib/custom_code/actions/index.dart";
pub const WIDGETS_INDEX_PATH: &str = "lib/custom_code/widgets/index.dart";
pub const PUBSPEC_PATH: &str = "pubspec.yaml";

pub const MY_ACTION: &str = r#"// Automatic FlutterFlow imports
import '/backend/schema/structs/index.dart';
import '/flutter_flow/flutter_flow_theme.dart';
import '/flutter_flow/flutter_flow_util.dart';
import 'index.dart'; // Imports other custom actions
import '/flutter_flow/custom_functions.dart'; // Imports custom functions
import 'package:flutter/material.dart';
// Begin custom action code
// DO NOT REMOVE OR MODIFY THE CODE ABOVE!

import 'package:file_picker/file_picker.dart';

Future<List<String>> myAction() async {
  // Add your function code here!
  return [""];
}
"#;

pub const MY_WIDGET: &str = r#"// Automatic FlutterFlow imports
import '/backend/schema/structs/index.dart';
import '/flutter_flow/flutter_flow_theme.dart';
import '/flutter_flow/flutter_flow_util.dart';
import 'index.dart'; // Imports other custom widgets
import '/custom_code/actions/index.dart'; // Imports custom actions
import '/flutter_flow/custom_functions.dart'; // Imports custom functions
import 'package:flutter/material.dart';
// Begin custom widget code
// DO NOT REMOVE OR MODIFY THE CODE ABOVE!

class MyWidget extends StatefulWidget {
  const MyWidget({
    super.key,
    this.width,
    this.height,
  });

  final double? width;
  final double? height;

  @override
  State<MyWidget> createState() => _MyWidgetState();
}

class _MyWidgetState extends State<MyWidget> {
  @override
  Widget build(BuildContext context) {
    return Container();
  }
}
"#;

pub const CUSTOM_FUNCTIONS: &str = r#"import 'dart:convert';
import 'dart:math' as math;

import 'package:flutter/material.dart';
import 'package:intl/intl.dart';
import 'lat_lng.dart';
import '/backend/schema/structs/index.dart';

String func335() {
  return "func335";
}

String func336(String param1) {
  return "func336 $param1";
}

Future<DocumentReference?> createTestRun(
  String label,
  String hashBefore,
  String hashAfter, {
  List<String>? projectIds,
}) async {
  if (label.isEmpty) {
    ffLog('Invalid label: $label');
    return null;
  }
  return null;
}
"#;

pub const ACTIONS_INDEX: &str = "export 'my_action.dart' show myAction;\n";

pub const WIDGETS_INDEX: &str = "export 'my_widget.dart' show MyWidget;\n";

pub const PUBSPEC: &str = r#"name: flutter_flow_custom_code_editor
description: A FlutterFlow custom code editor
publish_to: none
version: 1.0.0
"#;

/// Shared functions file holding exactly the given `(name, body)` functions.
pub fn functions_file(functions: &[(&str, &str)]) -> String {
    let mut out = String::from("import 'dart:math' as math;\n");
    for (name, body) in functions {
        out.push_str(&format!("\nvoid {name}() {{\n  {body}\n}}\n"));
    }
    out
}

/// An action file declaring `name`.
pub fn action_file(name: &str) -> String {
    format!("import 'index.dart';\n\nFuture {name}() async {{\n  print('{name}');\n}}\n")
}
